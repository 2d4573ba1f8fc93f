//! Domain layer with core entities, the layout engine and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Masonry layout engine.
pub mod layout;
/// Port definitions.
pub mod ports;

pub use entities::{ImageId, ImageItem};
pub use errors::{FeedError, MeasureError};
pub use ports::{ImageFeedPort, ImageFetchPort, RowLoader};
