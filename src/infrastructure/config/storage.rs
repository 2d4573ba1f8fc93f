//! The `config.toml` file: where it lives, how it is read, and the default
//! written on first start.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::app_config::AppConfig;

/// Errors raised while reading or writing the config file.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl ConfigError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from an existing file.
    File,
    /// No file existed; the defaults were written to it.
    Created,
    /// The file could not be parsed and was left untouched.
    Defaults {
        /// Parser message.
        reason: String,
    },
}

/// A configuration together with its origin.
#[derive(Debug)]
pub struct LoadedConfig {
    /// Parsed or default configuration.
    pub config: AppConfig,
    /// Origin of `config`.
    pub source: ConfigSource,
}

/// The single config file pixwall reads.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    /// Uses `path_override` if given, else `config.toml` in the platform
    /// config directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigDirNotFound`] when there is no override
    /// and the platform has no config directory.
    pub fn locate(path_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        path_override
            .or_else(AppConfig::default_config_path)
            .map(Self::at)
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Uses `path` as is.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file, writing the defaults first if it does not exist.
    ///
    /// A file that fails to parse yields the defaults and is not overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or the default
    /// cannot be written.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = AppConfig::default();
                self.write(&config)?;
                return Ok(LoadedConfig {
                    config,
                    source: ConfigSource::Created,
                });
            }
            Err(e) => return Err(ConfigError::io(&self.path, e)),
        };

        Ok(match toml::from_str::<AppConfig>(&content) {
            Ok(config) => {
                debug!(path = %self.path.display(), "Config file parsed");
                LoadedConfig {
                    config,
                    source: ConfigSource::File,
                }
            }
            Err(e) => LoadedConfig {
                config: AppConfig::default(),
                source: ConfigSource::Defaults {
                    reason: e.to_string(),
                },
            },
        })
    }

    /// Replaces the file with `config`, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on serialization or filesystem failure.
    pub fn write(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;

        let mut temp_file =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| ConfigError::io(parent, e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| ConfigError::io(temp_file.path(), e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| ConfigError::io(&self.path, e.error))?;

        info!(path = %self.path.display(), "Wrote default config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let file = ConfigFile::at(dir.path().join("nested").join("config.toml"));

        let loaded = file.load().unwrap();

        assert_eq!(loaded.source, ConfigSource::Created);
        assert!(loaded.config.mouse);
        let written: AppConfig = toml::from_str(&fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(written.feed.per_page, AppConfig::default().feed.per_page);
        // Only the config file remains; the temp file was persisted over it.
        assert_eq!(fs::read_dir(dir.path().join("nested")).unwrap().count(), 1);
    }

    #[test]
    fn test_existing_file_is_parsed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[grid]\ncard_width = 36\n").unwrap();

        let loaded = ConfigFile::locate(Some(path)).unwrap().load().unwrap();

        assert_eq!(loaded.source, ConfigSource::File);
        assert_eq!(loaded.config.grid.card_width, 36);
    }

    #[test]
    fn test_malformed_file_falls_back_and_is_kept() {
        let dir = tempdir().unwrap();
        let file = ConfigFile::at(dir.path().join("config.toml"));
        fs::write(file.path(), "invalid_toml = [").unwrap();

        let loaded = file.load().unwrap();

        assert!(matches!(loaded.source, ConfigSource::Defaults { .. }));
        assert!(loaded.config.mouse);
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "invalid_toml = [");
    }

    #[test]
    fn test_unreadable_path_is_an_error() {
        let dir = tempdir().unwrap();
        let file = ConfigFile::at(dir.path());

        assert!(matches!(file.load(), Err(ConfigError::Io { .. })));
    }
}
