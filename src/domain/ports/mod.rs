mod image_feed_port;
mod image_fetch_port;
mod row_loader_port;

pub use image_feed_port::ImageFeedPort;
pub use image_fetch_port::ImageFetchPort;
pub use row_loader_port::RowLoader;
