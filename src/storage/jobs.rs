// src/storage/jobs.rs

//! Per-signature job state.
//!
//! One JSON file per job signature under the store's directory. The two
//! completion flags make re-running a job idempotent: a crashed worker
//! resumes at the first incomplete phase.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::CrawlParams;

/// Persisted state of one crawl job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    /// Job signature, also the file name
    pub signature: String,

    /// Entity the job belongs to
    pub entity: String,

    /// Normalized parameters the job was created with
    pub params: CrawlParams,

    /// Crawl phase completed
    #[serde(default)]
    pub is_crawled: bool,

    /// Index phase completed. Never true before `is_crawled`.
    #[serde(default)]
    pub is_indexed: bool,
}

/// File-backed store of job states.
pub struct JobStore {
    dir: PathBuf,
}

impl JobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, signature: &str) -> PathBuf {
        self.dir.join(format!("{signature}.json"))
    }

    /// Return the existing state for this signature, or create and persist
    /// a fresh one. A second call with the same parameters returns the
    /// stored state rather than duplicating work.
    pub fn load_or_create(&self, entity: &str, params: &CrawlParams) -> Result<JobState> {
        let signature = params.signature();
        if let Some(state) = self.load(&signature)? {
            return Ok(state);
        }
        let state = JobState {
            signature,
            entity: entity.to_string(),
            params: params.clone(),
            is_crawled: false,
            is_indexed: false,
        };
        self.write(&state)?;
        Ok(state)
    }

    /// Persist the crawl-phase completion flag.
    pub fn mark_crawled(&self, signature: &str) -> Result<()> {
        let mut state = self.require(signature)?;
        state.is_crawled = true;
        self.write(&state)
    }

    /// Persist the index-phase completion flag. Refused while the crawl
    /// phase is incomplete.
    pub fn mark_indexed(&self, signature: &str) -> Result<()> {
        let mut state = self.require(signature)?;
        if !state.is_crawled {
            return Err(AppError::validation(format!(
                "job '{signature}' cannot be marked indexed before it is crawled"
            )));
        }
        state.is_indexed = true;
        self.write(&state)
    }

    fn load(&self, signature: &str) -> Result<Option<JobState>> {
        match fs::read_to_string(self.path(signature)) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn require(&self, signature: &str) -> Result<JobState> {
        self.load(signature)?
            .ok_or_else(|| AppError::validation(format!("no job state for '{signature}'")))
    }

    /// Write atomically (temp file, then rename).
    fn write(&self, state: &JobState) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(&state.signature);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
