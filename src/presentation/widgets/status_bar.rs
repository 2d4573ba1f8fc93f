//! Status bar widget.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::domain::layout::ScrollInfo;

/// Status bar severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

impl StatusLevel {
    /// Returns color for level.
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Self::Info => Color::Cyan,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }
}

/// Snapshot of the feed and grid shown in the status bar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridSummary {
    /// Feed name.
    pub feed: &'static str,
    /// Search query, empty for "everything".
    pub query: String,
    /// Images loaded so far.
    pub loaded: usize,
    /// Total images the feed reported.
    pub total: Option<usize>,
    /// Pages being fetched.
    pub pages_in_flight: usize,
    /// Images being measured.
    pub measuring: usize,
    /// Last reported scroll metrics.
    pub scroll: ScrollInfo,
    /// Last feed error, if any.
    pub error: Option<String>,
}

impl GridSummary {
    /// Scroll position as a percentage of the scrollable range.
    #[must_use]
    pub fn scroll_percent(&self) -> u32 {
        let max = self.scroll.max_scroll_top();
        if max == 0 {
            return 100;
        }
        let percent = u64::from(self.scroll.scroll_top) * 100 / u64::from(max);
        u32::try_from(percent.min(100)).unwrap_or(100)
    }
}

/// Status bar widget.
#[derive(Debug, Clone)]
pub struct StatusBar {
    left: String,
    center: String,
    right: String,
    level: StatusLevel,
}

impl StatusBar {
    /// Creates empty status bar.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            left: String::new(),
            center: String::new(),
            right: String::new(),
            level: StatusLevel::Info,
        }
    }

    /// Sets left content.
    #[must_use]
    pub fn left(mut self, content: impl Into<String>) -> Self {
        self.left = content.into();
        self
    }

    /// Sets center content.
    #[must_use]
    pub fn center(mut self, content: impl Into<String>) -> Self {
        self.center = content.into();
        self
    }

    /// Sets right content.
    #[must_use]
    pub fn right(mut self, content: impl Into<String>) -> Self {
        self.right = content.into();
        self
    }

    /// Sets status level.
    #[must_use]
    pub const fn level(mut self, level: StatusLevel) -> Self {
        self.level = level;
        self
    }

    /// Builds the grid status line.
    ///
    /// Left: feed and query. Center: load progress or the last error.
    /// Right: scroll position.
    #[must_use]
    pub fn for_grid(summary: &GridSummary) -> Self {
        let query = if summary.query.is_empty() {
            "everything".to_string()
        } else {
            format!("\"{}\"", summary.query)
        };
        let left = format!(" {} · {query}", summary.feed);

        let mut progress = match summary.total {
            Some(total) => format!("{}/{total} images", summary.loaded),
            None => format!("{} images", summary.loaded),
        };
        if summary.pages_in_flight > 0 {
            progress.push_str(" · fetching");
        }
        if summary.measuring > 0 {
            progress.push_str(&format!(" · measuring {}", summary.measuring));
        }

        let right = format!("{:>3}% ", summary.scroll_percent());

        match &summary.error {
            Some(error) => Self::new()
                .left(left)
                .center(format!("⚠ {error}"))
                .right(right)
                .level(StatusLevel::Error),
            None => Self::new().left(left).center(progress).right(right),
        }
    }

    /// Creates warning status bar.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new().left(message).level(StatusLevel::Warning)
    }
}

impl Default for StatusBar {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &StatusBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default()
            .fg(self.level.color())
            .add_modifier(Modifier::BOLD);

        let width = area.width as usize;

        let left_len = self.left.width();
        let center_len = self.center.width();
        let right_len = self.right.width();

        let center_start = width.saturating_sub(center_len) / 2;
        let right_start = width.saturating_sub(right_len);

        let mut spans = Vec::new();

        spans.push(Span::styled(&self.left, style));

        let left_padding = center_start.saturating_sub(left_len);
        if left_padding > 0 {
            spans.push(Span::raw(" ".repeat(left_padding)));
        }

        if !self.center.is_empty() {
            spans.push(Span::styled(&self.center, style));
        }

        let current_len = left_len + left_padding + center_len;
        let right_padding = right_start.saturating_sub(current_len);
        if right_padding > 0 {
            spans.push(Span::raw(" ".repeat(right_padding)));
        }

        if !self.right.is_empty() {
            spans.push(Span::styled(&self.right, style));
        }

        let line = Line::from(spans);
        let paragraph = Paragraph::new(line).style(Style::default().bg(Color::Black));
        paragraph.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> GridSummary {
        GridSummary {
            feed: "pixabay",
            query: "red fox".to_string(),
            loaded: 100,
            total: Some(500),
            pages_in_flight: 1,
            measuring: 4,
            scroll: ScrollInfo {
                client_height: 10,
                scroll_height: 110,
                scroll_top: 50,
            },
            error: None,
        }
    }

    fn line(bar: &StatusBar, width: u16) -> String {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        bar.render(area, &mut buf);
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_grid_status_line() {
        let text = line(&StatusBar::for_grid(&summary()), 100);
        assert!(text.starts_with(" pixabay · \"red fox\""));
        assert!(text.contains("100/500 images · fetching · measuring 4"));
        assert!(text.trim_end().ends_with("50%"));
    }

    #[test]
    fn test_error_replaces_progress() {
        let mut summary = summary();
        summary.error = Some("rate limited".to_string());
        let bar = StatusBar::for_grid(&summary);
        assert_eq!(bar.level, StatusLevel::Error);

        let text = line(&bar, 100);
        assert!(text.contains("⚠ rate limited"));
        assert!(!text.contains("images"));
    }

    #[test]
    fn test_empty_query_and_unknown_total() {
        let summary = GridSummary {
            feed: "directory",
            loaded: 3,
            ..GridSummary::default()
        };
        let text = line(&StatusBar::for_grid(&summary), 60);
        assert!(text.contains("directory · everything"));
        assert!(text.contains("3 images"));
        assert!(!text.contains("fetching"));
    }

    #[test]
    fn test_scroll_percent() {
        let mut summary = summary();
        assert_eq!(summary.scroll_percent(), 50);
        summary.scroll.scroll_top = 0;
        assert_eq!(summary.scroll_percent(), 0);
        summary.scroll = ScrollInfo::default();
        assert_eq!(summary.scroll_percent(), 100);
    }
}
