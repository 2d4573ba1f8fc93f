//! Local directory feed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::domain::entities::{FeedPage, ImageItem};
use crate::domain::errors::FeedError;
use crate::domain::ports::ImageFeedPort;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Serves the images of one local directory as a paged feed.
#[derive(Debug, Clone)]
pub struct DirectoryFeed {
    root: PathBuf,
}

impl DirectoryFeed {
    /// Creates a feed over `root`. The directory is read on every page request.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn matching_files(&self, query: &str) -> Result<Vec<PathBuf>, FeedError> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            FeedError::io(format!("failed to read {}: {e}", self.root.display()))
        })?;

        let needle = query.trim().to_lowercase();
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FeedError::io(e.to_string()))?
        {
            let path = entry.path();
            if !is_image_file(&path) {
                continue;
            }
            let name = file_name(&path).to_lowercase();
            if needle.is_empty() || name.contains(&needle) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| file_name(a).cmp(file_name(b)));
        trace!(count = files.len(), query = %query, "Directory scanned");
        Ok(files)
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn item_for(index: usize, path: &Path) -> ImageItem {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let url = format!("file://{}", absolute.display());
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let tags = stem
        .split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let owner = absolute
        .parent()
        .map(|p| file_name(p).to_string())
        .unwrap_or_default();

    let mut item = ImageItem::new(url.clone())
        .with_id(index as u64 + 1)
        .with_tags(tags)
        .with_user(owner)
        .with_page_url(url.clone());
    item.preview_url = url;
    if let Ok((width, height)) = image::image_dimensions(path) {
        item.webformat_width = width;
        item.webformat_height = height;
    }
    item
}

#[async_trait]
impl ImageFeedPort for DirectoryFeed {
    async fn fetch_page(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<FeedPage, FeedError> {
        let files = self.matching_files(query).await?;
        let total_hits = files.len();
        let per_page = per_page.max(1) as usize;
        let start = (page.max(1) as usize - 1).saturating_mul(per_page);

        let selected: Vec<(usize, PathBuf)> = files
            .into_iter()
            .enumerate()
            .skip(start)
            .take(per_page)
            .collect();

        let items = tokio::task::spawn_blocking(move || {
            selected
                .iter()
                .map(|(index, path)| item_for(*index, path))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| FeedError::io(format!("directory task failed: {e}")))?;

        debug!(
            root = %self.root.display(),
            page,
            received = items.len(),
            total_hits,
            "Directory page read"
        );
        Ok(FeedPage { items, total_hits })
    }

    fn page_size(&self, requested: u32) -> u32 {
        requested.max(1)
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}
