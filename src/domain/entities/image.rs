//! Image entities shared by the feed, the measurer and the grid.

use serde::{Deserialize, Serialize};

/// Unique identifier for an image in the measurement pipeline.
/// Generated from a hash of the display URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(pub String);

impl ImageId {
    /// Creates a new `ImageId` from any string-like input.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates an `ImageId` from a URL by hashing it.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..16]))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Natural size of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Creates new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Height divided by width, `None` for degenerate sizes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(f64::from(self.height) / f64::from(self.width))
        }
    }
}

impl std::fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Status of an image in the measurement pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageStatus {
    /// Loading has not started (or the decoded image was recycled).
    #[default]
    NotStarted,
    /// Image is being fetched and decoded.
    Loading,
    /// Image is decoded and ready for display.
    Ready,
    /// Loading failed with an error message.
    Failed(String),
}

impl ImageStatus {
    /// Returns true if the image is ready for rendering.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns true if the image is currently being loaded.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns true if loading failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns true if loading hasn't started yet.
    #[must_use]
    pub const fn is_not_started(&self) -> bool {
        matches!(self, Self::NotStarted)
    }
}

/// One image returned by a feed.
///
/// Field names follow the Pixabay hit schema so API responses deserialize
/// directly; everything except the display URL is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    /// Feed-specific identifier.
    #[serde(default)]
    pub id: u64,
    /// URL used to display the image in the grid.
    #[serde(rename = "webformatURL")]
    pub webformat_url: String,
    /// Landing page of the image.
    #[serde(rename = "pageURL", default)]
    pub page_url: String,
    /// Small preview URL.
    #[serde(rename = "previewURL", default)]
    pub preview_url: String,
    /// Comma separated tags.
    #[serde(default)]
    pub tags: String,
    /// Author name.
    #[serde(default)]
    pub user: String,
    /// Number of likes.
    #[serde(default)]
    pub likes: u64,
    /// Width the feed reported for the display image.
    #[serde(default)]
    pub webformat_width: u32,
    /// Height the feed reported for the display image.
    #[serde(default)]
    pub webformat_height: u32,
}

impl ImageItem {
    /// Creates an item with only a display URL.
    #[must_use]
    pub fn new(webformat_url: impl Into<String>) -> Self {
        Self {
            id: 0,
            webformat_url: webformat_url.into(),
            page_url: String::new(),
            preview_url: String::new(),
            tags: String::new(),
            user: String::new(),
            likes: 0,
            webformat_width: 0,
            webformat_height: 0,
        }
    }

    /// Sets the feed identifier.
    #[must_use]
    pub const fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Sets the landing page.
    #[must_use]
    pub fn with_page_url(mut self, page_url: impl Into<String>) -> Self {
        self.page_url = page_url.into();
        self
    }

    /// Identifier used by the measurement pipeline.
    #[must_use]
    pub fn image_id(&self) -> ImageId {
        ImageId::from_url(&self.webformat_url)
    }

    /// Size reported by the feed, if any.
    #[must_use]
    pub const fn reported_dimensions(&self) -> Option<ImageDimensions> {
        if self.webformat_width == 0 || self.webformat_height == 0 {
            None
        } else {
            Some(ImageDimensions::new(
                self.webformat_width,
                self.webformat_height,
            ))
        }
    }

    /// Tags as a trimmed list.
    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }
}

/// An image item paired with its measured natural size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasuredItem {
    /// The image.
    pub item: ImageItem,
    /// Natural size, `None` until measurement resolves.
    pub size: Option<ImageDimensions>,
}

impl MeasuredItem {
    /// Wraps an item whose size is not known yet.
    #[must_use]
    pub const fn pending(item: ImageItem) -> Self {
        Self { item, size: None }
    }

    /// Returns true once the natural size is known.
    #[must_use]
    pub const fn is_measured(&self) -> bool {
        self.size.is_some()
    }
}

/// One page of results from an image feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPage {
    /// Items on this page, in feed order.
    pub items: Vec<ImageItem>,
    /// Total number of hits reachable through the feed.
    pub total_hits: usize,
}
