//! Domain entity definitions.

mod image;

pub use image::{FeedPage, ImageDimensions, ImageId, ImageItem, ImageStatus, MeasuredItem};
