//! Domain error types.

mod feed_error;
mod measure_error;

pub use feed_error::FeedError;
pub use measure_error::{MeasureError, MeasureResult};
