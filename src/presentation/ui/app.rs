//! Main application orchestrator.

use std::io::stdout;
use std::sync::Arc;

use crossterm::event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream};
use crossterm::execute;
use futures_util::StreamExt;
use parking_lot::Mutex;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::{DefaultTerminal, Frame};
use ratatui_image::picker::Picker;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::application::FeedPaginator;
use crate::domain::layout::ScrollInfo;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::image::{ImageMeasuredEvent, ImageMeasurer};
use crate::presentation::events::{EventHandler, KeyAction, MouseAction};
use crate::presentation::widgets::{
    GridEvent, GridProps, GridSummary, MasonryGrid, MasonryGridState, MasonryHandle, StatusBar,
};

/// The image wall application.
pub struct App {
    paginator: Arc<FeedPaginator>,
    measurer: ImageMeasurer,
    grid: MasonryGridState,
    handle: MasonryHandle,
    grid_rx: mpsc::UnboundedReceiver<GridEvent>,
    measured_rx: mpsc::UnboundedReceiver<ImageMeasuredEvent>,
    scroll: Arc<Mutex<ScrollInfo>>,
    grid_area: Arc<Mutex<Rect>>,
    revision: u64,
    last_error: Option<String>,
    mouse: bool,
    exiting: bool,
}

impl App {
    /// Creates the application around a paginator and a measurer.
    ///
    /// `measured_rx` must receive the measurer's events.
    #[must_use]
    pub fn new(
        config: &AppConfig,
        paginator: Arc<FeedPaginator>,
        measurer: ImageMeasurer,
        measured_rx: mpsc::UnboundedReceiver<ImageMeasuredEvent>,
    ) -> Self {
        let props = GridProps {
            metrics: config.grid.card_metrics(),
            overscan: config.grid.overscan,
            loader: config.grid.loader_options(),
        };
        let (grid_tx, grid_rx) = mpsc::unbounded_channel();
        let mut grid = MasonryGridState::new(props, paginator.clone(), grid_tx);

        let scroll = Arc::new(Mutex::new(ScrollInfo::default()));
        let grid_area = Arc::new(Mutex::new(Rect::default()));
        {
            let scroll = scroll.clone();
            grid.on_scroll(move |info| {
                trace!(top = info.scroll_top, height = info.scroll_height, "Grid scrolled");
                *scroll.lock() = info;
            });
            let grid_area = grid_area.clone();
            grid.register_child(move |area| *grid_area.lock() = area);
        }
        let handle = grid.masonry_ref();

        Self {
            paginator,
            measurer,
            grid,
            handle,
            grid_rx,
            measured_rx,
            scroll,
            grid_area,
            revision: 0,
            last_error: None,
            mouse: config.mouse,
            exiting: false,
        }
    }

    /// Draws images with `picker`. Without one, cards show placeholders.
    #[must_use]
    pub fn with_picker(mut self, picker: Picker) -> Self {
        self.grid.set_picker(picker);
        self
    }

    /// # Errors
    /// Returns error if drawing to the terminal fails.
    pub async fn run(mut self, terminal: &mut DefaultTerminal) -> color_eyre::Result<()> {
        info!(
            feed = self.paginator.feed_name(),
            query = self.paginator.query(),
            "Opening image wall"
        );
        if self.mouse {
            execute!(stdout(), EnableMouseCapture)?;
        }

        let result = self.run_event_loop(terminal).await;

        if self.mouse {
            execute!(stdout(), DisableMouseCapture)?;
        }
        self.measurer.cancel_all();
        info!(
            loaded = self.paginator.loaded_count(),
            cache = %self.measurer.memory_cache().stats(),
            "Application exiting normally"
        );
        result
    }

    async fn run_event_loop(&mut self, terminal: &mut DefaultTerminal) -> color_eyre::Result<()> {
        let mut terminal_events = EventStream::new();

        self.draw(terminal)?;

        while !self.exiting {
            let terminal_event = terminal_events.next();

            tokio::select! {
                biased;

                Some(event) = terminal_event => {
                    match event {
                        Ok(event) => self.handle_terminal_event(&event),
                        Err(e) => warn!(error = %e, "Terminal event error"),
                    }
                    if !self.exiting {
                        self.draw(terminal)?;
                    }
                }

                Some(event) = self.grid_rx.recv() => {
                    if self.handle_grid_event(&event) {
                        self.draw(terminal)?;
                    }
                }

                Some(event) = self.measured_rx.recv() => {
                    if self.grid.apply_measurement(event) {
                        self.draw(terminal)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn draw(&mut self, terminal: &mut DefaultTerminal) -> color_eyre::Result<()> {
        terminal.draw(|frame| self.render(frame))?;
        self.after_render();
        Ok(())
    }

    /// Starts the row loads and measurements the last render asked for.
    fn after_render(&mut self) {
        let loads = self.grid.dispatch_loads();
        if loads > 0 {
            debug!(loads, "Dispatched row loads");
        }
        for id in self.grid.take_cancel_requests() {
            self.measurer.cancel(&id);
        }
        // The measurer serves newest requests first; queue bottom-up so the
        // top of the viewport resolves first.
        for (id, url) in self.grid.take_measure_requests().into_iter().rev() {
            self.measurer.measure(id, url);
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let [grid_area, status_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

        frame.render_stateful_widget(MasonryGrid::new(), grid_area, &mut self.grid);

        let summary = self.summary();
        frame.render_widget(&StatusBar::for_grid(&summary), status_area);
    }

    fn summary(&self) -> GridSummary {
        GridSummary {
            feed: self.paginator.feed_name(),
            query: self.paginator.query().to_string(),
            loaded: self.paginator.loaded_count(),
            total: self.paginator.total_hits(),
            pages_in_flight: self.paginator.pages_in_flight(),
            measuring: self.grid.measuring_count(),
            scroll: *self.scroll.lock(),
            error: self.last_error.clone(),
        }
    }

    /// Returns true if the screen should be drawn again.
    fn handle_grid_event(&mut self, event: &GridEvent) -> bool {
        let GridEvent::RowsLoaded { range, result } = event;
        let failed = match result {
            Ok(()) => {
                self.last_error = None;
                false
            }
            Err(e) => {
                warn!(%range, error = %e, "Loading images failed");
                self.last_error = Some(e.to_string());
                true
            }
        };

        let revision = self.paginator.revision();
        let changed = revision != self.revision;
        if changed {
            self.revision = revision;
            self.grid.set_images(&self.paginator.images());
        }

        let refresh = self.grid.complete_load(event);
        refresh || changed || failed
    }

    fn handle_terminal_event(&mut self, event: &Event) {
        match event {
            Event::Key(key) => match EventHandler::key_action(key) {
                Some(KeyAction::Quit) => self.exiting = true,
                Some(KeyAction::OpenFocused) => self.open_focused(),
                Some(KeyAction::Grid(command)) => self.handle.push(command),
                None => {}
            },
            Event::Mouse(mouse) if self.mouse => match EventHandler::mouse_action(mouse) {
                Some(MouseAction::Scroll(delta)) => self.handle.scroll_by(delta),
                Some(MouseAction::Click { column, row }) => {
                    let area = *self.grid_area.lock();
                    if area.contains(Position::new(column, row)) {
                        self.grid.focus_at(column, row);
                    }
                }
                None => {}
            },
            _ => {}
        }
    }

    fn open_focused(&mut self) {
        let Some(item) = self.grid.focused_item() else {
            return;
        };
        let target = if item.page_url.is_empty() {
            item.webformat_url.clone()
        } else {
            item.page_url.clone()
        };
        match opener::open(&target) {
            Ok(()) => info!(url = %target, "Opened image page"),
            Err(e) => {
                warn!(url = %target, error = %e, "Failed to open image page");
                self.last_error = Some(format!("could not open {target}"));
            }
        }
    }
}
