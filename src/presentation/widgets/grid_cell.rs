//! Per-cell image state for the masonry grid.

use std::sync::Arc;

use ratatui_image::picker::{Capability, Picker, ProtocolType};
use ratatui_image::protocol::StatefulProtocol;

use crate::domain::entities::{ImageDimensions, ImageId, ImageItem, ImageStatus};

/// Cells around the rendered range whose images are requested.
pub const LOAD_BUFFER: usize = 5;

/// One image in the grid with its measurement and display state.
pub struct GridCell {
    pub item: ImageItem,
    pub id: ImageId,
    /// Natural size once measured.
    pub size: Option<ImageDimensions>,
    pub image: Option<Arc<image::DynamicImage>>,
    pub protocol: Option<StatefulProtocol>,
    pub status: ImageStatus,
}

impl GridCell {
    #[must_use]
    pub fn new(item: ImageItem) -> Self {
        let id = item.image_id();
        Self {
            item,
            id,
            size: None,
            image: None,
            protocol: None,
            status: ImageStatus::NotStarted,
        }
    }

    /// Best known size: measured, else what the feed reported.
    #[must_use]
    pub fn known_dimensions(&self) -> Option<ImageDimensions> {
        if self.status.is_failed() {
            return None;
        }
        self.size.or_else(|| self.item.reported_dimensions())
    }

    pub fn set_loaded(&mut self, natural: ImageDimensions, image: Arc<image::DynamicImage>) {
        self.size = Some(natural);
        self.image = Some(image);
        self.status = ImageStatus::Ready;
        self.protocol = None;
    }

    pub fn set_loading(&mut self) {
        self.status = ImageStatus::Loading;
    }

    pub fn set_failed(&mut self, error: String) {
        self.size = None;
        self.image = None;
        self.protocol = None;
        self.status = ImageStatus::Failed(error);
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.image.is_some() && self.status.is_ready()
    }

    #[must_use]
    pub const fn needs_load(&self) -> bool {
        self.status.is_not_started()
    }

    pub fn update_protocol_if_needed(&mut self, picker: &Picker) {
        if self.protocol.is_some() {
            return;
        }

        if let Some(ref image) = self.image {
            self.protocol = Some(picker.new_resize_protocol((**image).clone()));
        }
    }

    pub fn clear_protocol(&mut self) {
        self.protocol = None;
    }

    /// Drops the decoded image; it is requested again when it comes back into view.
    ///
    /// Returns true if a measurement was still outstanding and should be
    /// cancelled.
    pub fn recycle(&mut self) -> bool {
        self.protocol = None;
        if self.image.take().is_some() && self.status.is_ready() {
            self.status = ImageStatus::NotStarted;
        }
        if self.status.is_loading() {
            self.status = ImageStatus::NotStarted;
            return true;
        }
        false
    }
}

impl std::fmt::Debug for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridCell")
            .field("id", &self.id)
            .field("url", &self.item.webformat_url)
            .field("size", &self.size)
            .field("has_image", &self.image.is_some())
            .field("has_protocol", &self.protocol.is_some())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Queries the terminal for its graphics protocol, falling back to halfblocks.
#[must_use]
pub fn detect_picker() -> Picker {
    let mut picker = Picker::from_query_stdio().unwrap_or_else(|_| Picker::halfblocks());

    let caps = picker.capabilities();
    let has_sixel = caps.iter().any(|c| matches!(c, Capability::Sixel));
    let has_kitty = caps.iter().any(|c| matches!(c, Capability::Kitty));

    if has_sixel && !has_kitty && picker.protocol_type() == ProtocolType::Halfblocks {
        picker.set_protocol_type(ProtocolType::Sixel);
    }

    picker
}

/// Drops protocols outside the rendered range plus [`LOAD_BUFFER`] and
/// decoded images outside three times that.
///
/// Returns the ids of recycled cells whose measurement never arrived.
pub fn recycle_distant(
    cells: &mut [GridCell],
    visible_start: usize,
    visible_end: usize,
) -> Vec<ImageId> {
    let buffer_start = visible_start.saturating_sub(LOAD_BUFFER);
    let buffer_end = visible_end + LOAD_BUFFER;

    let memory_buffer = LOAD_BUFFER * 3;
    let memory_start = visible_start.saturating_sub(memory_buffer);
    let memory_end = visible_end + memory_buffer;

    let mut abandoned = Vec::new();
    for (idx, cell) in cells.iter_mut().enumerate() {
        if idx < memory_start || idx > memory_end {
            if cell.recycle() {
                abandoned.push(cell.id.clone());
            }
        } else if idx < buffer_start || idx > buffer_end {
            cell.clear_protocol();
        }
    }
    abandoned
}

/// Cells near the rendered range whose image was never requested.
#[must_use]
pub fn collect_needed_loads(
    cells: &[GridCell],
    visible_start: usize,
    visible_end: usize,
) -> Vec<usize> {
    let buffer_start = visible_start.saturating_sub(LOAD_BUFFER);
    let buffer_end = visible_end + LOAD_BUFFER;

    cells
        .iter()
        .enumerate()
        .filter(|(idx, cell)| *idx >= buffer_start && *idx <= buffer_end && cell.needs_load())
        .map(|(idx, _)| idx)
        .collect()
}
