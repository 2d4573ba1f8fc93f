//! Image feed adapters.

mod directory;
mod dto;
mod pixabay;

pub use directory::DirectoryFeed;
pub use pixabay::{MAX_PER_PAGE, MIN_PER_PAGE, PixabayClient};
