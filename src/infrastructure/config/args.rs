use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pixwall",
    version,
    about = "A masonry image wall for the terminal",
    long_about = None
)]
pub struct CliArgs {
    /// Search query.
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Browse a local directory instead of Pixabay.
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Pixabay API key.
    #[arg(long, env = "PIXABAY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable mouse support.
    #[arg(long)]
    pub mouse: Option<bool>,

    /// Results per page.
    #[arg(long, value_name = "N")]
    pub per_page: Option<u32>,

    /// Card width in terminal columns.
    #[arg(long, value_name = "N")]
    pub card_width: Option<u16>,

    /// Card placeholder height in terminal rows.
    #[arg(long, value_name = "N")]
    pub card_height: Option<u16>,
}
