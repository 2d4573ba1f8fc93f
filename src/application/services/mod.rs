pub mod feed_paginator;

pub use feed_paginator::{DEFAULT_MAX_ROWS, FeedPaginator};
