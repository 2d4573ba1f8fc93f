//! Row loading port consumed by the masonry grid.

use async_trait::async_trait;

use crate::domain::errors::FeedError;
use crate::domain::layout::IndexRange;

/// Supplies row availability and loads missing rows on demand.
#[async_trait]
pub trait RowLoader: Send + Sync {
    /// Returns true if the row at `index` is available.
    ///
    /// Must answer consistently for the same index within one loading cycle.
    fn is_row_loaded(&self, index: usize) -> bool;

    /// Number of rows presently known to exist, loaded or not.
    fn row_count(&self) -> usize;

    /// Loads every row of `range`. Resolves once the attempt is over.
    async fn load_more_rows(&self, range: IndexRange) -> Result<(), FeedError>;
}
