// src/models/job.rs

//! Crawl parameters and the job signature derived from them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::slugify;

/// Canonical string format for the since/until bounds. Bounds are
/// normalized to this before they enter the signature or the job state.
pub const BOUND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Filters for one crawl request, before they are pinned to a mode.
///
/// `mentions: None` means "both modes": the entity's own timeline first,
/// then posts mentioning it.
#[derive(Debug, Clone, Default)]
pub struct CrawlFilters {
    pub limit: Option<usize>,
    pub since: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
    pub mentions: Option<bool>,
    pub only_cached: bool,
}

impl CrawlFilters {
    /// Modes to run, in order.
    pub fn modes(&self) -> Vec<bool> {
        match self.mentions {
            Some(mentions) => vec![mentions],
            None => vec![false, true],
        }
    }
}

/// Fully resolved parameters for one crawl run in one mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlParams {
    pub handle: String,
    pub mentions: bool,
    pub limit: Option<usize>,
    pub since: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
    pub language: Option<String>,

    /// Skip the crawl phase and serve replay from the existing buffer file.
    #[serde(default)]
    pub only_cached: bool,
}

impl CrawlParams {
    pub fn new(handle: impl Into<String>, mentions: bool, filters: &CrawlFilters) -> Self {
        Self {
            handle: handle.into(),
            mentions,
            limit: filters.limit,
            since: filters.since,
            until: filters.until,
            language: None,
            only_cached: filters.only_cached,
        }
    }

    /// The query sent to the crawl source: "@handle" when searching for
    /// mentions, the bare handle for the entity's own timeline.
    pub fn query(&self) -> String {
        if self.mentions {
            format!("@{}", self.handle)
        } else {
            self.handle.clone()
        }
    }

    /// Deterministic filesystem-safe slug for this configuration.
    ///
    /// Built from the query token and the normalized date bounds; "@" is on
    /// the retained-punctuation allowlist so the two modes never collide.
    pub fn signature(&self) -> String {
        let mut parts = vec![self.query()];
        if let Some(since) = self.since {
            parts.push(since.format(BOUND_FORMAT).to_string());
        }
        if let Some(until) = self.until {
            parts.push(until.format(BOUND_FORMAT).to_string());
        }
        slugify(&parts.join("_"), &['@'])
    }

    /// Buffer file name for this signature.
    pub fn buffer_file_name(&self) -> String {
        format!("results_{}.bin", self.signature())
    }

    /// Resume marker file name for this signature. The marker belongs to
    /// the crawl source; we only hand it the path.
    pub fn resume_file_name(&self) -> String {
        format!("resume_{}.txt", self.signature())
    }

    /// Copy of these params that replays the existing buffer file instead
    /// of crawling.
    pub fn cached(&self) -> Self {
        let mut params = self.clone();
        params.only_cached = true;
        params
    }
}
