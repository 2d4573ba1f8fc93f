//! Virtualized masonry grid widget.
//!
//! Composes the layout engine, the cell size cache, the column positioner
//! and the infinite loader into one stateful widget. The state owns the
//! per-cell image state; loading and measuring happen outside and are fed
//! back through [`MasonryGridState::apply_measurement`] and
//! [`MasonryGridState::complete_load`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    widgets::{
        Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget,
    },
};
use ratatui_image::picker::Picker;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::grid_cell::{GridCell, collect_needed_loads, recycle_distant};
use super::image_card::{ImageCard, ImageCardStyle, measure_height};
use crate::domain::entities::{ImageId, ImageItem};
use crate::domain::errors::FeedError;
use crate::domain::layout::{
    CardMetrics, CellSize, CellSizeCache, CellSizeCacheParams, ColumnConfig, DEFAULT_OVERSCAN,
    IndexRange, InfiniteLoader, InfiniteLoaderOptions, LayoutPass, MasonryLayout,
    MasonryPositioner, PositionedCell, ScrollInfo, VisibleCell,
};
use crate::domain::ports::RowLoader;
use crate::infrastructure::image::ImageMeasuredEvent;

/// Static grid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridProps {
    /// Card geometry.
    pub metrics: CardMetrics,
    /// Rows rendered beyond the viewport.
    pub overscan: u16,
    /// Infinite loader tuning.
    pub loader: InfiniteLoaderOptions,
}

impl Default for GridProps {
    fn default() -> Self {
        Self {
            metrics: CardMetrics::default(),
            overscan: DEFAULT_OVERSCAN,
            loader: InfiniteLoaderOptions::default(),
        }
    }
}

/// Events produced by tasks the grid spawned.
#[derive(Debug)]
pub enum GridEvent {
    /// A `load_more_rows` call resolved.
    RowsLoaded {
        /// Requested range.
        range: IndexRange,
        /// Outcome of the load.
        result: Result<(), FeedError>,
    },
}

/// Imperative commands applied on the next render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridCommand {
    /// Resets the positioner and places every cell again.
    RecomputeCellPositions,
    /// Scrolls to an absolute row.
    ScrollTo(u32),
    /// Scrolls by a number of rows.
    ScrollBy(i32),
    /// Scrolls by a number of viewport heights.
    ScrollPages(i32),
}

/// Cloneable handle for controlling a grid from outside its render pass.
#[derive(Debug, Clone, Default)]
pub struct MasonryHandle {
    commands: Arc<Mutex<VecDeque<GridCommand>>>,
}

impl MasonryHandle {
    /// Queues a command.
    pub fn push(&self, command: GridCommand) {
        self.commands.lock().push_back(command);
    }

    /// Discards every position and places cells again.
    pub fn recompute_cell_positions(&self) {
        self.push(GridCommand::RecomputeCellPositions);
    }

    /// Scrolls to `top`, clamped to the content height.
    pub fn scroll_to(&self, top: u32) {
        self.push(GridCommand::ScrollTo(top));
    }

    /// Scrolls by `delta` rows.
    pub fn scroll_by(&self, delta: i32) {
        self.push(GridCommand::ScrollBy(delta));
    }

    fn drain(&self) -> Vec<GridCommand> {
        self.commands.lock().drain(..).collect()
    }
}

type ScrollCallback = Box<dyn FnMut(ScrollInfo) + Send>;
type ChildCallback = Box<dyn FnMut(Rect) + Send>;

/// State of the masonry grid.
pub struct MasonryGridState {
    props: GridProps,
    row_loader: Arc<dyn RowLoader>,
    events: mpsc::UnboundedSender<GridEvent>,
    cells: Vec<GridCell>,
    index_by_id: HashMap<ImageId, Vec<usize>>,
    cache: CellSizeCache,
    positioner: MasonryPositioner,
    layout: MasonryLayout,
    loader: InfiniteLoader,
    picker: Option<Picker>,
    handle: MasonryHandle,
    on_scroll: Option<ScrollCallback>,
    register_child: Option<ChildCallback>,
    last_width: Option<u16>,
    last_scroll: Option<ScrollInfo>,
    last_pass: LayoutPass,
    last_area: Rect,
    needs_relayout: bool,
    focused: Option<usize>,
    current_focus: Option<usize>,
    pending_loads: Vec<IndexRange>,
    pending_measures: Vec<(ImageId, String)>,
    pending_cancels: Vec<ImageId>,
    last_load_error: Option<String>,
}

impl std::fmt::Debug for MasonryGridState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasonryGridState")
            .field("props", &self.props)
            .field("cells", &self.cells.len())
            .field("positioned", &self.layout.positioned_count())
            .field("column_count", &self.positioner.column_count())
            .field("scroll", &self.last_scroll)
            .finish_non_exhaustive()
    }
}

impl MasonryGridState {
    /// Creates an empty grid. The size cache and positioner live as long as the state.
    #[must_use]
    pub fn new(
        props: GridProps,
        row_loader: Arc<dyn RowLoader>,
        events: mpsc::UnboundedSender<GridEvent>,
    ) -> Self {
        let metrics = props.metrics;
        let cache = CellSizeCache::new(CellSizeCacheParams {
            default_width: metrics.width,
            default_height: metrics.height,
            fixed_width: true,
        });
        let positioner = MasonryPositioner::new(ColumnConfig {
            column_count: 0,
            column_width: cache.default_width(),
            spacer: metrics.gutter,
        });

        Self {
            props,
            row_loader,
            events,
            cells: Vec::new(),
            index_by_id: HashMap::new(),
            cache,
            positioner,
            layout: MasonryLayout::new(props.overscan),
            loader: InfiniteLoader::new(props.loader),
            picker: None,
            handle: MasonryHandle::default(),
            on_scroll: None,
            register_child: None,
            last_width: None,
            last_scroll: None,
            last_pass: LayoutPass::default(),
            last_area: Rect::default(),
            needs_relayout: false,
            focused: None,
            current_focus: None,
            pending_loads: Vec::new(),
            pending_measures: Vec::new(),
            pending_cancels: Vec::new(),
            last_load_error: None,
        }
    }

    /// Uses `picker` to draw images. Without one, cards show placeholders.
    pub fn set_picker(&mut self, picker: Picker) {
        debug!(protocol = ?picker.protocol_type(), "Image protocol selected");
        self.picker = Some(picker);
        for cell in &mut self.cells {
            cell.clear_protocol();
        }
    }

    /// Called with the scroll metrics whenever they change.
    pub fn on_scroll(&mut self, callback: impl FnMut(ScrollInfo) + Send + 'static) {
        self.on_scroll = Some(Box::new(callback));
    }

    /// Called with the grid area after every render.
    pub fn register_child(&mut self, callback: impl FnMut(Rect) + Send + 'static) {
        self.register_child = Some(Box::new(callback));
    }

    /// Handle for imperative control.
    #[must_use]
    pub fn masonry_ref(&self) -> MasonryHandle {
        self.handle.clone()
    }

    /// Number of images in the grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true when the grid has no images.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Current number of columns.
    #[must_use]
    pub const fn column_count(&self) -> u16 {
        self.positioner.column_count()
    }

    /// Scroll metrics of the last render.
    #[must_use]
    pub fn scroll_info(&self) -> ScrollInfo {
        self.last_pass.scroll
    }

    /// Index range of the last render.
    #[must_use]
    pub fn rendered_range(&self) -> Option<IndexRange> {
        self.last_pass.rendered
    }

    /// Position of a placed cell.
    #[must_use]
    pub fn position_of(&self, index: usize) -> Option<PositionedCell> {
        self.layout.position_of(index)
    }

    /// Cached size of a cell.
    #[must_use]
    pub fn cell_size(&self, index: usize) -> Option<CellSize> {
        self.cache.get(index)
    }

    /// Row load requests still unresolved.
    #[must_use]
    pub fn loads_in_flight(&self) -> usize {
        self.loader.in_flight_count()
    }

    /// Images currently being measured.
    #[must_use]
    pub fn measuring_count(&self) -> usize {
        self.cells.iter().filter(|c| c.status.is_loading()).count()
    }

    /// Image under focus: the last clicked card if still visible, else the
    /// topmost fully visible card.
    #[must_use]
    pub fn focused_item(&self) -> Option<&ImageItem> {
        self.current_focus
            .and_then(|index| self.cells.get(index))
            .map(|cell| &cell.item)
    }

    /// Replaces the image list.
    ///
    /// Appending keeps every cached size and position. Any other change
    /// drops cells from the first difference on and places cells again;
    /// cached sizes of shifted indices are kept and may be stale.
    pub fn set_images(&mut self, images: &[ImageItem]) {
        let shared = self
            .cells
            .iter()
            .zip(images)
            .take_while(|(cell, item)| cell.item.webformat_url == item.webformat_url)
            .count();

        if shared < self.cells.len() {
            warn!(
                kept = shared,
                previous = self.cells.len(),
                "Image list changed in place, cached sizes may be stale"
            );
            self.cells.truncate(shared);
            self.index_by_id.clear();
            for (index, cell) in self.cells.iter().enumerate() {
                self.index_by_id.entry(cell.id.clone()).or_default().push(index);
            }
            self.reset_positions();
        }

        for item in &images[shared..] {
            let cell = GridCell::new(item.clone());
            self.index_by_id
                .entry(cell.id.clone())
                .or_default()
                .push(self.cells.len());
            self.cells.push(cell);
        }
        if images.len() > shared {
            debug!(added = images.len() - shared, total = self.cells.len(), "Images appended");
        }
    }

    /// Applies a measurement result. Results for unknown images are ignored.
    ///
    /// Returns true if any cell changed.
    pub fn apply_measurement(&mut self, event: ImageMeasuredEvent) -> bool {
        let Some(indices) = self.index_by_id.get(&event.id).cloned() else {
            trace!(id = %event.id, "Measurement for unknown image ignored");
            return false;
        };

        for index in indices {
            let Some(cell) = self.cells.get_mut(index) else {
                continue;
            };
            match &event.result {
                Ok(measured) => cell.set_loaded(measured.natural, measured.image.clone()),
                Err(error) => cell.set_failed(error.clone()),
            }
            self.refine_size(index);
        }
        true
    }

    /// Updates the cached height of an already measured cell.
    fn refine_size(&mut self, index: usize) {
        if !self.cache.has(index) {
            return;
        }
        let metrics = self.props.metrics;
        let height = measure_height(metrics, self.cells[index].known_dimensions());
        if self.cache.height(index) != height {
            trace!(index, from = self.cache.height(index), to = height, "Refining cell height");
            self.cache.set(index, metrics.width, height);
            self.needs_relayout = true;
        }
    }

    /// Handles the result of a row load.
    ///
    /// Returns true if the load touched the rendered rows or failed on an
    /// empty grid, so the grid should be drawn again.
    pub fn complete_load(&mut self, event: &GridEvent) -> bool {
        let GridEvent::RowsLoaded { range, result } = event;
        match result {
            Ok(()) => self.last_load_error = None,
            Err(e) => {
                debug!(%range, error = %e, "Row load failed");
                self.last_load_error = Some(e.to_string());
            }
        }
        let touched = self.loader.complete(*range);
        touched || (result.is_err() && self.cells.is_empty())
    }

    /// Row ranges requested by the last renders.
    pub fn take_load_requests(&mut self) -> Vec<IndexRange> {
        std::mem::take(&mut self.pending_loads)
    }

    /// Images that should be measured, as `(id, url)`.
    pub fn take_measure_requests(&mut self) -> Vec<(ImageId, String)> {
        std::mem::take(&mut self.pending_measures)
    }

    /// Images whose queued measurement is no longer wanted.
    pub fn take_cancel_requests(&mut self) -> Vec<ImageId> {
        std::mem::take(&mut self.pending_cancels)
    }

    /// Message of the last failed row load, cleared by the next success.
    #[must_use]
    pub fn last_load_error(&self) -> Option<&str> {
        self.last_load_error.as_deref()
    }

    /// Spawns `load_more_rows` for every pending request.
    ///
    /// Results arrive as [`GridEvent::RowsLoaded`] on the event channel.
    pub fn dispatch_loads(&mut self) -> usize {
        let requests = self.take_load_requests();
        for range in &requests {
            let range = *range;
            let row_loader = self.row_loader.clone();
            let events = self.events.clone();
            tokio::spawn(async move {
                let result = row_loader.load_more_rows(range).await;
                if events.send(GridEvent::RowsLoaded { range, result }).is_err() {
                    debug!(%range, "Grid event receiver dropped");
                }
            });
        }
        requests.len()
    }

    /// Focuses the card at a screen position of the last render.
    pub fn focus_at(&mut self, column: u16, row: u16) -> bool {
        let area = self.last_area;
        let scroll_top = self.last_pass.scroll.scroll_top;
        let hit = self.last_pass.cells.iter().find(|cell| {
            screen_rect(cell, scroll_top, area).is_some_and(|(left, top, right, bottom)| {
                (left..right).contains(&i64::from(column)) && (top..bottom).contains(&i64::from(row))
            })
        });
        if let Some(cell) = hit {
            self.focused = Some(cell.index);
            self.current_focus = Some(cell.index);
            true
        } else {
            false
        }
    }

    fn reset_positions(&mut self) {
        self.positioner.reset(self.positioner.config());
        self.layout.recompute_cell_positions();
        self.needs_relayout = false;
    }

    fn apply_commands(&mut self, viewport_height: u16) {
        for command in self.handle.drain() {
            trace!(?command, "Applying grid command");
            match command {
                GridCommand::RecomputeCellPositions => {
                    self.reset_positions();
                    self.loader.reset_scan();
                }
                GridCommand::ScrollTo(top) => self.layout.scroll_to(top),
                GridCommand::ScrollBy(delta) => self.layout.scroll_by(delta),
                GridCommand::ScrollPages(pages) => self
                    .layout
                    .scroll_by(pages.saturating_mul(i32::from(viewport_height.max(1)))),
            }
            if !matches!(command, GridCommand::RecomputeCellPositions) {
                self.focused = None;
            }
        }
    }

    /// Resets the positioner when the available width changed.
    fn auto_size(&mut self, width: u16) {
        if self.last_width == Some(width) {
            return;
        }
        let metrics = self.props.metrics;
        let column_count = metrics.column_count(width);
        debug!(width, column_count, "Grid width changed, resetting positioner");
        self.positioner.reset(ColumnConfig {
            column_count,
            column_width: metrics.width,
            spacer: metrics.gutter,
        });
        self.layout.recompute_cell_positions();
        self.needs_relayout = false;
        self.last_width = Some(width);
    }

    fn resolve_focus(&self, pass: &LayoutPass) -> Option<usize> {
        if let Some(index) = self.focused
            && pass.cells.iter().any(|cell| cell.index == index)
        {
            return Some(index);
        }
        pass.cells
            .iter()
            .filter(|cell| cell.top >= pass.scroll.scroll_top)
            .min_by_key(|cell| (cell.top, cell.left))
            .map(|cell| cell.index)
    }

    fn request_rows(&mut self, pass: &LayoutPass) {
        let row_count = self.row_loader.row_count();
        let rendered = pass
            .rendered
            .or_else(|| (self.cells.is_empty() && row_count > 0).then_some(IndexRange::new(0, 0)));
        let Some(rendered) = rendered else {
            return;
        };
        let row_loader = &self.row_loader;
        let requests =
            self.loader
                .on_rows_rendered(rendered, row_count, |index| row_loader.is_row_loaded(index));
        self.pending_loads.extend(requests);
    }

    fn request_measurements(&mut self, pass: &LayoutPass) {
        let Some(rendered) = pass.rendered else {
            return;
        };
        for index in collect_needed_loads(&self.cells, rendered.start, rendered.stop) {
            let cell = &mut self.cells[index];
            cell.set_loading();
            self.pending_measures
                .push((cell.id.clone(), cell.item.webformat_url.clone()));
        }
        let abandoned = recycle_distant(&mut self.cells, rendered.start, rendered.stop);
        if !abandoned.is_empty() {
            trace!(count = abandoned.len(), "Cancelling measurements of recycled cells");
            self.pending_cancels.extend(abandoned);
        }
    }

    /// Renders the card of one visible cell.
    ///
    /// Cards crossing the viewport edge are drawn into an off-screen buffer
    /// and clipped; their image is replaced by a placeholder.
    pub fn render_cell(
        &mut self,
        cell: &VisibleCell,
        area: Rect,
        buf: &mut Buffer,
        style: &ImageCardStyle,
    ) {
        let scroll_top = self.last_pass.scroll.scroll_top;
        let focused = self.current_focus == Some(cell.index);
        let Some((left, top, right, bottom)) = screen_rect(cell, scroll_top, area) else {
            return;
        };
        let Some(grid_cell) = self.cells.get_mut(cell.index) else {
            return;
        };

        let fully_visible = top >= i64::from(area.top())
            && bottom <= i64::from(area.bottom())
            && right <= i64::from(area.right());

        if fully_visible {
            if let Some(picker) = &self.picker
                && grid_cell.is_ready()
            {
                grid_cell.update_protocol_if_needed(picker);
            }
            let rect = Rect::new(to_u16(left), to_u16(top), cell.width, cell.height);
            ImageCard::new(&grid_cell.item, &grid_cell.status)
                .protocol(grid_cell.protocol.as_mut())
                .focused(focused)
                .style(style.clone())
                .render(rect, buf);
            return;
        }

        let local = Rect::new(0, 0, cell.width, cell.height);
        let mut scratch = Buffer::empty(local);
        ImageCard::new(&grid_cell.item, &grid_cell.status)
            .focused(focused)
            .style(style.clone())
            .render(local, &mut scratch);

        for sy in 0..cell.height {
            let y = top + i64::from(sy);
            if y < i64::from(area.top()) || y >= i64::from(area.bottom()) {
                continue;
            }
            for sx in 0..cell.width {
                let x = left + i64::from(sx);
                if x >= i64::from(area.right()) {
                    break;
                }
                buf[(to_u16(x), to_u16(y))] = scratch[(sx, sy)].clone();
            }
        }
    }

    fn render_hint(&self, area: Rect, buf: &mut Buffer) {
        let hint = if self.positioner.column_count() == 0 {
            format!("Terminal too narrow (need {} columns)", self.props.metrics.width)
        } else if !self.cells.is_empty() {
            return;
        } else if self.loader.in_flight_count() > 0 {
            "Loading images…".to_string()
        } else if self.row_loader.row_count() == 0 {
            "No images found".to_string()
        } else if let Some(error) = &self.last_load_error {
            format!("Loading failed: {error} (press r to retry)")
        } else {
            "No images loaded (press r to retry)".to_string()
        };
        let y = area.y + area.height / 2;
        Paragraph::new(hint)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .render(Rect::new(area.x, y, area.width, 1), buf);
    }

    fn render_grid(&mut self, area: Rect, buf: &mut Buffer, style: &ImageCardStyle) {
        self.apply_commands(area.height);
        self.last_area = area;
        if area.is_empty() {
            self.last_pass = LayoutPass::default();
            return;
        }

        self.auto_size(area.width);
        if self.needs_relayout {
            debug!("Cell sizes refined, recomputing positions");
            self.reset_positions();
        }

        let metrics = self.props.metrics;
        let cells = &self.cells;
        let pass = self.layout.layout(
            cells.len(),
            area.width,
            area.height,
            &mut self.cache,
            &mut self.positioner,
            |index| {
                CellSize::new(
                    metrics.width,
                    measure_height(metrics, cells[index].known_dimensions()),
                )
            },
        );

        if self.last_scroll != Some(pass.scroll) {
            self.last_scroll = Some(pass.scroll);
            if let Some(callback) = self.on_scroll.as_mut() {
                callback(pass.scroll);
            }
        }

        self.current_focus = self.resolve_focus(&pass);
        self.request_rows(&pass);
        self.request_measurements(&pass);
        self.last_pass = pass;

        let visible = self.last_pass.cells.clone();
        for cell in &visible {
            self.render_cell(cell, area, buf, style);
        }
        self.render_hint(area, buf);

        let scroll = self.last_pass.scroll;
        if scroll.scroll_height > u32::from(area.height) {
            let mut scrollbar_state = ScrollbarState::new(scroll.max_scroll_top() as usize)
                .position(scroll.scroll_top as usize)
                .viewport_content_length(usize::from(area.height));
            Scrollbar::new(ScrollbarOrientation::VerticalRight).render(
                area,
                buf,
                &mut scrollbar_state,
            );
        }

        if let Some(callback) = self.register_child.as_mut() {
            callback(area);
        }
    }
}

/// Screen bounds `(left, top, right, bottom)` of a cell, `None` if it is
/// entirely outside `area`.
fn screen_rect(cell: &VisibleCell, scroll_top: u32, area: Rect) -> Option<(i64, i64, i64, i64)> {
    let top = i64::from(area.y) + i64::from(cell.top) - i64::from(scroll_top);
    let left = i64::from(area.x) + i64::from(cell.left);
    let bottom = top + i64::from(cell.height);
    let right = left + i64::from(cell.width);
    let outside = bottom <= i64::from(area.top())
        || top >= i64::from(area.bottom())
        || left >= i64::from(area.right());
    (!outside).then_some((left, top, right, bottom))
}

fn to_u16(value: i64) -> u16 {
    u16::try_from(value.max(0)).unwrap_or(u16::MAX)
}

/// Masonry grid widget.
#[derive(Debug, Clone, Default)]
pub struct MasonryGrid {
    style: ImageCardStyle,
}

impl MasonryGrid {
    /// Creates the widget with the default card style.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the card style.
    #[must_use]
    pub fn style(mut self, style: ImageCardStyle) -> Self {
        self.style = style;
        self
    }
}

impl StatefulWidget for MasonryGrid {
    type State = MasonryGridState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        state.render_grid(area, buf, &self.style);
    }
}
