//! Card widget rendering one image with its tags, author and likes.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, StatefulWidget, Widget},
};
use ratatui_image::{Resize, StatefulImage, protocol::StatefulProtocol};
use unicode_width::UnicodeWidthStr;

use crate::domain::entities::{ImageDimensions, ImageItem, ImageStatus};
use crate::domain::layout::CardMetrics;

/// Rows taken by the border, the tag line and the author line.
pub const CARD_CHROME_ROWS: u16 = 4;
/// Columns taken by the border.
pub const CARD_CHROME_COLS: u16 = 2;
/// Height of a terminal cell relative to its width.
const CELL_ASPECT: f64 = 0.5;

/// Card height in rows for an image of `dimensions` at the card width.
///
/// Unknown dimensions use the placeholder height. Very tall images are
/// capped at three placeholder heights.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn measure_height(metrics: CardMetrics, dimensions: Option<ImageDimensions>) -> u16 {
    let Some(ratio) = dimensions.and_then(ImageDimensions::aspect_ratio) else {
        return metrics.height;
    };
    let inner_width = f64::from(metrics.width.saturating_sub(CARD_CHROME_COLS).max(1));
    let image_rows = (inner_width * ratio * CELL_ASPECT).round().clamp(1.0, f64::from(u16::MAX));
    let max_height = metrics.height.saturating_mul(3).max(CARD_CHROME_ROWS + 1);
    (image_rows as u16)
        .saturating_add(CARD_CHROME_ROWS)
        .clamp(CARD_CHROME_ROWS + 1, max_height)
}

/// Style for image cards.
#[derive(Debug, Clone)]
pub struct ImageCardStyle {
    pub border: Style,
    pub focused_border: Style,
    pub tags: Style,
    pub author: Style,
    pub likes: Style,
    pub placeholder: Style,
    pub error: Style,
}

impl Default for ImageCardStyle {
    fn default() -> Self {
        Self {
            border: Style::default().fg(Color::DarkGray),
            focused_border: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            tags: Style::default().fg(Color::Gray),
            author: Style::default().fg(Color::Cyan),
            likes: Style::default().fg(Color::Magenta),
            placeholder: Style::default().fg(Color::DarkGray),
            error: Style::default().fg(Color::Red),
        }
    }
}

/// Image card widget.
pub struct ImageCard<'a> {
    item: &'a ImageItem,
    status: &'a ImageStatus,
    protocol: Option<&'a mut StatefulProtocol>,
    focused: bool,
    style: ImageCardStyle,
}

impl<'a> ImageCard<'a> {
    #[must_use]
    pub fn new(item: &'a ImageItem, status: &'a ImageStatus) -> Self {
        Self {
            item,
            status,
            protocol: None,
            focused: false,
            style: ImageCardStyle::default(),
        }
    }

    /// Draws the image through `protocol` instead of a placeholder.
    #[must_use]
    pub fn protocol(mut self, protocol: Option<&'a mut StatefulProtocol>) -> Self {
        self.protocol = protocol;
        self
    }

    #[must_use]
    pub const fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    #[must_use]
    pub fn style(mut self, style: ImageCardStyle) -> Self {
        self.style = style;
        self
    }

    fn placeholder(&self) -> (String, Style) {
        match self.status {
            ImageStatus::Failed(_) => ("✕ broken image".to_string(), self.style.error),
            ImageStatus::Loading => ("loading…".to_string(), self.style.placeholder),
            ImageStatus::Ready | ImageStatus::NotStarted => {
                (String::new(), self.style.placeholder)
            }
        }
    }

    fn render_placeholder(&self, area: Rect, buf: &mut Buffer) {
        let pattern = Style::default().fg(Color::Rgb(60, 60, 60));
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                if (x + y) % 2 == 0 {
                    buf[(x, y)].set_symbol("·").set_style(pattern);
                }
            }
        }

        let (label, style) = self.placeholder();
        if label.is_empty() || area.height == 0 {
            return;
        }
        let label = truncate(&label, area.width);
        let width = u16::try_from(label.width()).unwrap_or(area.width);
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height / 2;
        buf.set_string(x, y, label, style);
    }
}

fn truncate(text: &str, max_width: u16) -> String {
    let max_width = usize::from(max_width);
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + 1 > max_width {
            break;
        }
        out.push(ch);
        width += ch_width;
    }
    out.push('…');
    out
}

impl Widget for ImageCard<'_> {
    fn render(mut self, area: Rect, buf: &mut Buffer) {
        let protocol = self.protocol.take();
        if area.width < CARD_CHROME_COLS || area.height < CARD_CHROME_ROWS {
            return;
        }

        let border_style = if self.focused {
            self.style.focused_border
        } else {
            self.style.border
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        let [image_area, tags_area, footer_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        let tags = self.item.tag_list().collect::<Vec<_>>().join(" · ");
        Paragraph::new(truncate(&tags, tags_area.width))
            .style(self.style.tags)
            .render(tags_area, buf);

        let likes = format!("♥ {}", self.item.likes);
        let likes_width = u16::try_from(likes.width()).unwrap_or(u16::MAX);
        let author_width = footer_area.width.saturating_sub(likes_width + 1);
        let author = if self.item.user.is_empty() {
            String::new()
        } else {
            truncate(&self.item.user, author_width)
        };
        let gap = footer_area
            .width
            .saturating_sub(u16::try_from(author.width()).unwrap_or(0) + likes_width);
        Line::from(vec![
            Span::styled(author, self.style.author),
            Span::raw(" ".repeat(usize::from(gap))),
            Span::styled(likes, self.style.likes),
        ])
        .render(footer_area, buf);

        if image_area.is_empty() {
            return;
        }
        if let Some(protocol) = protocol
            && self.status.is_ready()
        {
            StatefulWidget::render(
                StatefulImage::default().resize(Resize::Fit(None)),
                image_area,
                buf,
                protocol,
            );
            return;
        }
        self.render_placeholder(image_area, buf);
    }
}
