//! Asynchronous natural-size resolution for grid images.
//!
//! Requests are queued on a background worker, de-duplicated by `ImageId`
//! and bounded by a semaphore. Each task fetches the bytes, decodes them on
//! the blocking pool and reports the natural size together with a
//! display-sized copy of the image.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, trace, warn};

use crate::domain::entities::{ImageDimensions, ImageId};
use crate::domain::errors::{MeasureError, MeasureResult};
use crate::domain::ports::ImageFetchPort;

use super::memory_cache::{CachedImage, MemoryImageCache};

/// Result payload of a successful measurement.
#[derive(Debug, Clone)]
pub struct MeasuredImage {
    /// Size of the source image in pixels.
    pub natural: ImageDimensions,
    /// Decoded image, downsized to at most `max_decoded_width`.
    pub image: Arc<image::DynamicImage>,
}

impl From<CachedImage> for MeasuredImage {
    fn from(entry: CachedImage) -> Self {
        Self {
            natural: entry.natural,
            image: entry.image,
        }
    }
}

/// Message sent when an image finishes measuring.
#[derive(Debug, Clone)]
pub struct ImageMeasuredEvent {
    /// The image ID.
    pub id: ImageId,
    /// The measured image, or the failure message.
    pub result: Result<MeasuredImage, String>,
}

/// Configuration for the image measurer.
#[derive(Debug, Clone)]
pub struct ImageMeasurerConfig {
    /// Maximum images in memory cache.
    pub memory_cache_size: usize,
    /// Maximum concurrent downloads.
    pub max_concurrent_downloads: usize,
    /// Decoded images wider than this are downsized.
    pub max_decoded_width: u32,
}

impl Default for ImageMeasurerConfig {
    fn default() -> Self {
        Self {
            memory_cache_size: super::memory_cache::DEFAULT_CACHE_SIZE,
            max_concurrent_downloads: 4,
            max_decoded_width: 640,
        }
    }
}

#[derive(Debug)]
enum MeasurerCommand {
    Measure { id: ImageId, url: String },
    Cancel { id: ImageId },
    CancelAll,
}

/// Background image measurer.
pub struct ImageMeasurer {
    memory_cache: Arc<MemoryImageCache>,
    pending: Arc<Mutex<HashSet<ImageId>>>,
    request_tx: mpsc::UnboundedSender<MeasurerCommand>,
    config: ImageMeasurerConfig,
}

impl std::fmt::Debug for ImageMeasurer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageMeasurer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// State for the background worker loop.
struct WorkerState {
    task: MeasureTask,
    semaphore: Arc<Semaphore>,
    request_rx: mpsc::UnboundedReceiver<MeasurerCommand>,
}

/// Everything one measurement task needs, cloned per task.
#[derive(Clone)]
struct MeasureTask {
    fetcher: Arc<dyn ImageFetchPort>,
    memory_cache: Arc<MemoryImageCache>,
    pending: Arc<Mutex<HashSet<ImageId>>>,
    event_tx: mpsc::UnboundedSender<ImageMeasuredEvent>,
    max_decoded_width: u32,
}

impl ImageMeasurer {
    /// Creates a measurer and spawns its worker on the current runtime.
    #[must_use]
    pub fn new(
        config: ImageMeasurerConfig,
        fetcher: Arc<dyn ImageFetchPort>,
        event_tx: mpsc::UnboundedSender<ImageMeasuredEvent>,
    ) -> Self {
        let memory_cache = Arc::new(MemoryImageCache::new(config.memory_cache_size));
        let pending = Arc::new(Mutex::new(HashSet::new()));
        let (request_tx, request_rx) = mpsc::unbounded_channel();

        let worker_state = WorkerState {
            task: MeasureTask {
                fetcher,
                memory_cache: memory_cache.clone(),
                pending: pending.clone(),
                event_tx,
                max_decoded_width: config.max_decoded_width.max(1),
            },
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1))),
            request_rx,
        };

        tokio::spawn(Self::run_worker_loop(worker_state));

        Self {
            memory_cache,
            pending,
            request_tx,
            config,
        }
    }

    /// Worker loop to handle measurement requests and throttling.
    async fn run_worker_loop(mut state: WorkerState) {
        let mut queue: VecDeque<(ImageId, String)> = VecDeque::new();

        loop {
            tokio::select! {
                cmd = state.request_rx.recv() => {
                    match cmd {
                        Some(MeasurerCommand::Measure { id, url }) => {
                            if !queue.iter().any(|(qid, _)| *qid == id) {
                                queue.push_front((id, url));
                            }
                        }
                        Some(MeasurerCommand::Cancel { id }) => {
                            queue.retain(|(qid, _)| *qid != id);
                        }
                        Some(MeasurerCommand::CancelAll) => {
                            queue.clear();
                        }
                        None => break,
                    }
                }
                Ok(permit) = state.semaphore.clone().acquire_owned(), if !queue.is_empty() => {
                    if let Some((id, url)) = queue.pop_front() {
                        let task = state.task.clone();
                        tokio::spawn(async move {
                            task.run(id, url).await;
                            drop(permit);
                        });
                    }
                }
            }
        }
        debug!("Image measurer worker stopped");
    }

    /// Queues `url` for measurement. The result arrives on the event channel.
    pub fn measure(&self, id: ImageId, url: String) {
        if self.pending.lock().contains(&id) {
            trace!(id = %id, "Measurement already running");
            return;
        }
        if let Err(e) = self.request_tx.send(MeasurerCommand::Measure { id, url }) {
            error!("Failed to send measure request: {}", e);
        }
    }

    /// Drops a queued request. A running task still reports its result.
    pub fn cancel(&self, id: &ImageId) {
        if let Err(e) = self
            .request_tx
            .send(MeasurerCommand::Cancel { id: id.clone() })
        {
            error!("Failed to send cancel request: {}", e);
        }
    }

    /// Drops every queued request.
    pub fn cancel_all(&self) {
        if let Err(e) = self.request_tx.send(MeasurerCommand::CancelAll) {
            error!("Failed to send cancel all request: {}", e);
        }
    }

    /// Number of running measurements.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Memory cache shared with the worker.
    #[must_use]
    pub fn memory_cache(&self) -> &MemoryImageCache {
        &self.memory_cache
    }
}

impl MeasureTask {
    async fn run(&self, id: ImageId, url: String) {
        if !self.pending.lock().insert(id.clone()) {
            return;
        }

        let result = self.measure(&id, &url).await;
        self.pending.lock().remove(&id);

        let result = result.map_err(|e| {
            warn!(id = %id, url = %url, error = %e, "Image measurement failed");
            e.to_string()
        });
        if self
            .event_tx
            .send(ImageMeasuredEvent { id, result })
            .is_err()
        {
            debug!("Measurement receiver dropped");
        }
    }

    async fn measure(&self, id: &ImageId, url: &str) -> MeasureResult<MeasuredImage> {
        if let Some(entry) = self.memory_cache.get(id) {
            return Ok(entry.into());
        }

        let bytes = self.fetcher.fetch(url).await?;
        let max_width = self.max_decoded_width;
        let entry = tokio::task::spawn_blocking(move || decode(&bytes, max_width))
            .await
            .map_err(|e| MeasureError::Decode(format!("Decode task panicked: {e}")))??;

        debug!(id = %id, natural = %entry.natural, "Image measured");
        self.memory_cache.put(id.clone(), entry.clone());
        Ok(entry.into())
    }
}

/// Decodes `bytes`, keeping the natural size and downsizing wide images.
fn decode(bytes: &[u8], max_width: u32) -> MeasureResult<CachedImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| MeasureError::Decode(format!("Failed to decode image: {e}")))?;
    let natural = ImageDimensions::new(decoded.width(), decoded.height());
    let image = if decoded.width() > max_width {
        decoded.thumbnail(max_width, u32::MAX)
    } else {
        decoded
    };
    Ok(CachedImage {
        image: Arc::new(image),
        natural,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(buf)
    }

    struct FakeFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageFetchPort for FakeFetcher {
        async fn fetch(&self, url: &str) -> MeasureResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match url {
                "wide" => Ok(png_bytes(1200, 300)),
                "small" => Ok(png_bytes(40, 80)),
                "garbage" => Ok(Bytes::from_static(b"not an image")),
                _ => Err(MeasureError::Network("HTTP 404: Not Found".into())),
            }
        }
    }

    fn setup() -> (
        ImageMeasurer,
        Arc<FakeFetcher>,
        mpsc::UnboundedReceiver<ImageMeasuredEvent>,
    ) {
        let fetcher = Arc::new(FakeFetcher {
            calls: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let measurer = ImageMeasurer::new(ImageMeasurerConfig::default(), fetcher.clone(), tx);
        (measurer, fetcher, rx)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<ImageMeasuredEvent>) -> ImageMeasuredEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("measurement timed out")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_measures_natural_size_and_downsizes() {
        let (measurer, _, mut rx) = setup();
        let id = ImageId::new("wide");
        measurer.measure(id.clone(), "wide".into());

        let event = next_event(&mut rx).await;
        assert_eq!(event.id, id);
        let measured = event.result.unwrap();
        assert_eq!(measured.natural, ImageDimensions::new(1200, 300));
        assert_eq!(measured.image.width(), 640);
        assert_eq!(measured.image.height(), 160);
        assert!(measurer.memory_cache().get(&id).is_some());
    }

    #[tokio::test]
    async fn test_second_measure_served_from_cache() {
        let (measurer, fetcher, mut rx) = setup();
        let id = ImageId::new("small");

        measurer.measure(id.clone(), "small".into());
        next_event(&mut rx).await;
        measurer.measure(id.clone(), "small".into());
        let event = next_event(&mut rx).await;

        assert_eq!(
            event.result.unwrap().natural,
            ImageDimensions::new(40, 80)
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_reported() {
        let (measurer, _, mut rx) = setup();
        measurer.measure(ImageId::new("missing"), "missing".into());
        let event = next_event(&mut rx).await;
        assert!(event.result.unwrap_err().contains("404"));

        measurer.measure(ImageId::new("garbage"), "garbage".into());
        let event = next_event(&mut rx).await;
        assert!(event.result.unwrap_err().contains("decode"));
        assert_eq!(measurer.pending_count(), 0);
    }

    struct GatedFetcher {
        calls: AtomicUsize,
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl ImageFetchPort for GatedFetcher {
        async fn fetch(&self, _url: &str) -> MeasureResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(png_bytes(10, 10))
        }
    }

    #[tokio::test]
    async fn test_cancel_drops_queued_request() {
        let fetcher = Arc::new(GatedFetcher {
            calls: AtomicUsize::new(0),
            gate: tokio::sync::Notify::new(),
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = ImageMeasurerConfig {
            max_concurrent_downloads: 1,
            ..ImageMeasurerConfig::default()
        };
        let measurer = ImageMeasurer::new(config, fetcher.clone(), tx);

        let running = ImageId::new("running");
        measurer.measure(running.clone(), "running".into());
        tokio::time::timeout(Duration::from_secs(5), async {
            while fetcher.calls.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first fetch never started");

        let queued = ImageId::new("queued");
        measurer.measure(queued.clone(), "queued".into());
        measurer.cancel(&queued);
        fetcher.gate.notify_one();

        assert_eq!(next_event(&mut rx).await.id, running);
        let extra = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(extra.is_err());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_decode_keeps_small_images() {
        let entry = decode(&png_bytes(30, 20), 640).unwrap();
        assert_eq!(entry.natural, ImageDimensions::new(30, 20));
        assert_eq!(entry.image.width(), 30);
    }
}
