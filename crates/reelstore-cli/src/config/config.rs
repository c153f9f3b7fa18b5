//! `AppConfig` struct and TOML read/write.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reelstore_api::tmdb::{DEFAULT_IMAGE_BASE_URL, MovieSort};
use reelstore_catalog::{BatchOptions, CatalogConfig, DEFAULT_REQUEST_INTERVAL};
use serde::{Deserialize, Serialize};
use url::Url;

/// Top-level application configuration.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// TMDB endpoints and language.
    #[serde(default)]
    pub tmdb: TmdbConfig,
    /// Request pacing and batching.
    #[serde(default)]
    pub catalog: CatalogSettings,
    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// `[tmdb]` section.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TmdbConfig {
    /// API base URL.
    pub api_base_url: String,
    /// Image CDN base URL.
    pub image_base_url: String,
    /// Response language.
    pub language: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::from("https://api.themoviedb.org/3/"),
            image_base_url: String::from(DEFAULT_IMAGE_BASE_URL),
            language: String::from("en-US"),
        }
    }
}

/// `[catalog]` section.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogSettings {
    /// Pause between queued detail lookups, in milliseconds.
    pub request_interval_ms: u64,
    /// Detail lookups run concurrently per enrichment group.
    pub batch_size: usize,
    /// Pause between enrichment groups, in milliseconds.
    pub batch_delay_ms: u64,
    /// Default discover sort order (TMDB `sort_by` value).
    pub default_sort: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        let batch = BatchOptions::default();
        Self {
            request_interval_ms: u64::try_from(DEFAULT_REQUEST_INTERVAL.as_millis())
                .unwrap_or(100),
            batch_size: batch.batch_size,
            batch_delay_ms: u64::try_from(batch.batch_delay.as_millis()).unwrap_or(250),
            default_sort: String::from(MovieSort::default().as_str()),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Keep responses in SQLite across runs.
    pub persist: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { persist: true }
    }
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Saves config to a TOML file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config to TOML")?;
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Parses the API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `tmdb.api_base_url` is not a valid URL.
    pub fn api_base_url(&self) -> Result<Url> {
        Url::parse(&self.tmdb.api_base_url)
            .with_context(|| format!("invalid tmdb.api_base_url: {}", self.tmdb.api_base_url))
    }

    /// Builds the catalog configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `catalog.default_sort` is not a known sort order.
    pub fn catalog_config(&self) -> Result<CatalogConfig> {
        let default_sort: MovieSort = self
            .catalog
            .default_sort
            .parse()
            .context("invalid catalog.default_sort")?;

        Ok(CatalogConfig {
            language: self.tmdb.language.clone(),
            default_sort,
            request_interval: Duration::from_millis(self.catalog.request_interval_ms),
            batch: BatchOptions {
                batch_size: self.catalog.batch_size,
                batch_delay: Duration::from_millis(self.catalog.batch_delay_ms),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_default_config() {
        // Arrange & Act
        let config = AppConfig::default();

        // Assert
        assert_eq!(config.tmdb.language, "en-US");
        assert_eq!(config.catalog.request_interval_ms, 100);
        assert_eq!(config.catalog.batch_size, 5);
        assert_eq!(config.catalog.batch_delay_ms, 250);
        assert!(config.cache.persist);
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        // Act
        let config = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = AppConfig {
            tmdb: TmdbConfig {
                language: String::from("de-DE"),
                ..TmdbConfig::default()
            },
            cache: CacheConfig { persist: false },
            ..AppConfig::default()
        };

        // Act
        config.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_partial_section_keeps_field_defaults() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[catalog]\nbatch_size = 10\n").unwrap();

        // Act
        let config = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(config.catalog.batch_size, 10);
        assert_eq!(config.catalog.batch_delay_ms, 250);
        assert_eq!(config.tmdb, TmdbConfig::default());
    }

    #[test]
    fn test_catalog_config_conversion() {
        // Arrange
        let mut config = AppConfig::default();
        config.catalog.default_sort = String::from("title.asc");
        config.catalog.request_interval_ms = 40;

        // Act
        let catalog = config.catalog_config().unwrap();

        // Assert
        assert_eq!(catalog.default_sort, MovieSort::TitleAsc);
        assert_eq!(catalog.request_interval, Duration::from_millis(40));
        assert_eq!(catalog.batch, BatchOptions::default());
    }

    #[test]
    fn test_catalog_config_rejects_unknown_sort() {
        // Arrange
        let mut config = AppConfig::default();
        config.catalog.default_sort = String::from("rating.sideways");

        // Act
        let result = config.catalog_config();

        // Assert
        assert!(result.is_err());
    }

    #[test]
    fn test_api_base_url() {
        // Arrange
        let config = AppConfig::default();

        // Act
        let url = config.api_base_url().unwrap();

        // Assert
        assert_eq!(url.as_str(), "https://api.themoviedb.org/3/");
    }
}
