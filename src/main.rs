use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pixwall::application::FeedPaginator;
use pixwall::domain::ImageFeedPort;
use pixwall::infrastructure::{
    AppConfig, CliArgs, ConfigFile, ConfigSource, DirectoryFeed, ImageFetcher, ImageMeasurer,
    PixabayClient,
};
use pixwall::presentation::App;
use pixwall::presentation::widgets::detect_picker;

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn load_config() -> Result<(AppConfig, ConfigSource)> {
    let args = CliArgs::parse();
    let file = ConfigFile::locate(args.config.clone())?;
    let loaded = file.load()?;
    let mut config = loaded.config;
    config.merge_with_args(args);
    Ok((config, loaded.source))
}

fn create_feed(config: &AppConfig) -> Result<Arc<dyn ImageFeedPort>> {
    if let Some(directory) = &config.directory {
        if !directory.is_dir() {
            return Err(eyre!("{} is not a directory", directory.display()));
        }
        return Ok(Arc::new(DirectoryFeed::new(directory.clone())));
    }

    let api_key = config.api_key.clone().ok_or_else(|| {
        eyre!("a Pixabay API key is required: pass --api-key, set PIXABAY_API_KEY, or use --dir")
    })?;
    let client = PixabayClient::new(api_key, config.images.timeout_secs)?
        .with_safesearch(config.feed.safesearch);
    Ok(Arc::new(client))
}

fn create_app() -> Result<App> {
    let (config, source) = load_config()?;

    init_logging(&config)?;

    info!(version = pixwall::VERSION, "Starting {}", pixwall::NAME);
    if let ConfigSource::Defaults { reason } = &source {
        warn!(%reason, "Config file is malformed, using defaults");
    }

    let feed = create_feed(&config)?;
    let paginator = Arc::new(FeedPaginator::new(
        feed,
        config.effective_query(),
        config.feed.per_page,
        config.feed.max_rows,
    ));

    let fetcher = Arc::new(ImageFetcher::new(config.images.timeout_secs)?);
    let (measured_tx, measured_rx) = mpsc::unbounded_channel();
    let measurer = ImageMeasurer::new(config.images.measurer_config(), fetcher, measured_tx);

    Ok(App::new(&config, paginator, measurer, measured_rx))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let app = create_app()?;

    let mut terminal = ratatui::init();
    let picker = detect_picker();

    let result = app.with_picker(picker).run(&mut terminal).await;

    ratatui::restore();

    result
}
