mod grid_cell;
mod image_card;
mod masonry_grid;
mod status_bar;

pub use grid_cell::{GridCell, LOAD_BUFFER, detect_picker};
pub use image_card::{ImageCard, ImageCardStyle, measure_height};
pub use masonry_grid::{
    GridCommand, GridEvent, GridProps, MasonryGrid, MasonryGridState, MasonryHandle,
};
pub use status_bar::{GridSummary, StatusBar, StatusLevel};
