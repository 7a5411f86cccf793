// src/config.rs

//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Crawl source behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Crawl buffer settings
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Disk set cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Job state persistence settings
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Search index settings
    #[serde(default)]
    pub index: IndexConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.crawl_attempts == 0 {
            return Err(AppError::validation("crawler.crawl_attempts must be > 0"));
        }
        if self.buffer.capacity == 0 {
            return Err(AppError::validation("buffer.capacity must be > 0"));
        }
        if self.cache.enabled && self.cache.name.trim().is_empty() {
            return Err(AppError::validation(
                "cache.name must be set when the cache is enabled",
            ));
        }
        if self.index.url.trim().is_empty() {
            return Err(AppError::validation("index.url is empty"));
        }
        if self.index.index.trim().is_empty() {
            return Err(AppError::validation("index.index is empty"));
        }
        if self.index.chunk_size == 0 {
            return Err(AppError::validation("index.chunk_size must be > 0"));
        }
        if self.index.bulk_attempts == 0 {
            return Err(AppError::validation("index.bulk_attempts must be > 0"));
        }
        Ok(())
    }
}

/// Crawl source behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Retry ceiling for one crawl run. The source is rate-limited and
    /// intermittently fails, so this is effectively "until it succeeds".
    #[serde(default = "defaults::crawl_attempts")]
    pub crawl_attempts: u32,

    /// Delay between crawl retries in seconds
    #[serde(default = "defaults::crawl_retry_delay")]
    pub crawl_retry_delay_secs: u64,

    /// Language hint forced in mention mode
    #[serde(default = "defaults::mention_language")]
    pub mention_language: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            crawl_attempts: defaults::crawl_attempts(),
            crawl_retry_delay_secs: defaults::crawl_retry_delay(),
            mention_language: defaults::mention_language(),
        }
    }
}

/// Crawl buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Directory holding buffer files and resume markers
    #[serde(default = "defaults::buffer_dir")]
    pub dir: PathBuf,

    /// In-memory items held before an automatic flush
    #[serde(default = "defaults::buffer_capacity")]
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            dir: defaults::buffer_dir(),
            capacity: defaults::buffer_capacity(),
        }
    }
}

/// Disk set cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether replay filters against the cache at all
    #[serde(default = "defaults::cache_enabled")]
    pub enabled: bool,

    /// Root directory, one store per cache name underneath
    #[serde(default = "defaults::cache_root")]
    pub root: PathBuf,

    /// Cache consulted when filtering replayed posts
    #[serde(default = "defaults::cache_name")]
    pub name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::cache_enabled(),
            root: defaults::cache_root(),
            name: defaults::cache_name(),
        }
    }
}

/// Job state persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Directory holding one job state file per signature
    #[serde(default = "defaults::jobs_dir")]
    pub dir: PathBuf,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            dir: defaults::jobs_dir(),
        }
    }
}

/// Search index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the search index
    #[serde(default = "defaults::index_url")]
    pub url: String,

    /// Index name for bulk writes
    #[serde(default = "defaults::index_name")]
    pub index: String,

    /// Records per bulk write
    #[serde(default = "defaults::chunk_size")]
    pub chunk_size: usize,

    /// Attempts per chunk before giving up
    #[serde(default = "defaults::bulk_attempts")]
    pub bulk_attempts: u32,

    /// Delay between chunk retries in seconds
    #[serde(default = "defaults::bulk_retry_delay")]
    pub bulk_retry_delay_secs: u64,

    /// Per-attempt request timeout in seconds
    #[serde(default = "defaults::bulk_timeout")]
    pub bulk_timeout_secs: u64,

    /// Longer timeout for full-collection reindex operations
    #[serde(default = "defaults::reindex_timeout")]
    pub reindex_timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: defaults::index_url(),
            index: defaults::index_name(),
            chunk_size: defaults::chunk_size(),
            bulk_attempts: defaults::bulk_attempts(),
            bulk_retry_delay_secs: defaults::bulk_retry_delay(),
            bulk_timeout_secs: defaults::bulk_timeout(),
            reindex_timeout_secs: defaults::reindex_timeout(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn crawl_attempts() -> u32 {
        1000
    }
    pub fn crawl_retry_delay() -> u64 {
        1
    }
    pub fn mention_language() -> String {
        "en".into()
    }

    // Buffer defaults
    pub fn buffer_dir() -> PathBuf {
        "state/buffers".into()
    }
    pub fn buffer_capacity() -> usize {
        25_000
    }

    // Cache defaults
    pub fn cache_enabled() -> bool {
        true
    }
    pub fn cache_root() -> PathBuf {
        "state/seen".into()
    }
    pub fn cache_name() -> String {
        "indexed_posts".into()
    }

    // Jobs defaults
    pub fn jobs_dir() -> PathBuf {
        "state/jobs".into()
    }

    // Index defaults
    pub fn index_url() -> String {
        "http://localhost:9200".into()
    }
    pub fn index_name() -> String {
        "news".into()
    }
    pub fn chunk_size() -> usize {
        10_000
    }
    pub fn bulk_attempts() -> u32 {
        10
    }
    pub fn bulk_retry_delay() -> u64 {
        10
    }
    pub fn bulk_timeout() -> u64 {
        60
    }
    pub fn reindex_timeout() -> u64 {
        100
    }
}
