// src/storage/seen.rs

//! Disk-backed sets of previously seen identifiers.
//!
//! Each named cache is one `sled` store under the manager's root. A cache
//! is rebuilt in bulk by `refresh` from its registered source and read
//! concurrently by crawl jobs; refresh only ever adds entries.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};

/// Upserts per applied batch during a refresh.
const REFRESH_BATCH: usize = 10_000;

/// Source of identifiers for one named cache. `since` is an optional
/// cutoff; `None` means the full history.
#[async_trait]
pub trait SeenSource: Send + Sync {
    async fn fetch(&self, since: Option<DateTime<Utc>>) -> Result<Vec<String>>;
}

/// Manager for the named caches under one root directory.
pub struct SeenCaches {
    root: PathBuf,
    sources: HashMap<String, Box<dyn SeenSource>>,
}

impl SeenCaches {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sources: HashMap::new(),
        }
    }

    /// Register the source function backing a named cache.
    pub fn register(&mut self, name: impl Into<String>, source: Box<dyn SeenSource>) {
        self.sources.insert(name.into(), source);
    }

    /// Open a named cache for membership checks.
    pub fn open(&self, name: &str) -> Result<SeenSet> {
        SeenSet::open(self.root.join(name))
    }

    /// Recompute the membership set from the registered source and upsert
    /// every returned identifier. Additive: entries are never removed.
    pub async fn refresh(&self, name: &str, since: Option<DateTime<Utc>>) -> Result<usize> {
        let source = self.sources.get(name).ok_or_else(|| {
            AppError::config(format!("no source registered for cache '{name}'"))
        })?;
        let ids = source.fetch(since).await?;
        let set = self.open(name)?;
        set.insert_all(ids.iter().map(String::as_str))?;
        log::info!("refreshed cache '{}': {} ids upserted", name, ids.len());
        Ok(ids.len())
    }
}

/// Handle to one persistent identifier set.
pub struct SeenSet {
    db: sled::Db,
}

impl SeenSet {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            db: sled::open(path.into())?,
        })
    }

    /// Pure membership lookup.
    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.db.contains_key(id.as_bytes())?)
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Bulk-upsert identifiers as present, in batches.
    pub fn insert_all<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let mut batch = sled::Batch::default();
        let mut pending = 0;
        for id in ids {
            batch.insert(id.as_bytes(), [1u8].as_slice());
            pending += 1;
            if pending == REFRESH_BATCH {
                self.db.apply_batch(std::mem::take(&mut batch))?;
                pending = 0;
            }
        }
        if pending > 0 {
            self.db.apply_batch(batch)?;
        }
        self.db.flush()?;
        Ok(())
    }
}

/// Operator-facing source reading one identifier per line from a file.
pub struct FileSeenSource {
    path: PathBuf,
}

impl FileSeenSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SeenSource for FileSeenSource {
    async fn fetch(&self, _since: Option<DateTime<Utc>>) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
}
