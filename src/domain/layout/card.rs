//! Card sizing constants shared by the grid and its cells.

/// Default card width in terminal columns.
pub const DEFAULT_CARD_WIDTH: u16 = 28;
/// Default card height in terminal rows, used until an image is measured.
pub const DEFAULT_CARD_HEIGHT: u16 = 14;
/// Default space between columns and between stacked cards.
pub const DEFAULT_GUTTER: u16 = 1;

/// Card geometry in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardMetrics {
    /// Card (and column) width.
    pub width: u16,
    /// Placeholder height for cards whose image is not measured.
    pub height: u16,
    /// Gap between columns and between cards in a column.
    pub gutter: u16,
}

impl CardMetrics {
    /// Creates metrics, clamping width and height to at least one cell.
    #[must_use]
    pub fn new(width: u16, height: u16, gutter: u16) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            gutter,
        }
    }

    /// Number of columns that fit in `available_width`.
    ///
    /// This is `floor(available_width / width)`; the gutter is not
    /// subtracted, so the last column may be clipped at the right edge.
    #[must_use]
    pub const fn column_count(self, available_width: u16) -> u16 {
        available_width / self.width
    }
}

impl Default for CardMetrics {
    fn default() -> Self {
        Self {
            width: DEFAULT_CARD_WIDTH,
            height: DEFAULT_CARD_HEIGHT,
            gutter: DEFAULT_GUTTER,
        }
    }
}
