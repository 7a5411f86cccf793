// src/pipeline/buffer.rs

//! Crawl buffer: durable, resumable accumulation of crawled posts.
//!
//! Posts from the crawl source accumulate in memory and are flushed to an
//! append-only buffer file in encoded batches, so peak memory stays bounded
//! by the capacity no matter how large the crawl. Replay streams the file
//! back as a lazy sequence, scrubbing NUL characters and filtering posts
//! already present in the disk set cache. The buffer file is never deleted
//! here; it is retained for audit and replay.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::codec::{self, DecodeStream, Value};
use crate::error::Result;
use crate::models::{CrawlParams, Post};
use crate::storage::SeenSet;
use crate::utils::retry::RetryPolicy;

/// Receiver for posts produced by a crawl source.
pub trait PostSink: Send {
    fn append(&mut self, post: Post) -> Result<()>;
}

/// External crawl source boundary. The source must honor the resume marker
/// path so an interrupted crawl continues rather than restarts, and calls
/// `append` on the sink for each item it produces.
#[async_trait]
pub trait CrawlSource: Send + Sync {
    async fn fetch(
        &self,
        params: &CrawlParams,
        resume_marker: &Path,
        sink: &mut dyn PostSink,
    ) -> Result<()>;
}

/// Buffer for one crawl job, owned exclusively for its lifetime.
pub struct CrawlBuffer {
    dir: PathBuf,
    params: CrawlParams,
    capacity: usize,
    seen: Option<SeenSet>,
    batch: Vec<Post>,
    file: Option<File>,
    flushes: usize,
    retry: RetryPolicy,
}

impl CrawlBuffer {
    pub fn new(
        dir: impl Into<PathBuf>,
        params: &CrawlParams,
        capacity: usize,
        seen: Option<SeenSet>,
    ) -> Self {
        Self {
            dir: dir.into(),
            params: params.clone(),
            capacity,
            seen,
            batch: Vec::new(),
            file: None,
            flushes: 0,
            retry: RetryPolicy::fixed(1000, Duration::from_secs(1)),
        }
    }

    /// Override the crawl retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn buffer_path(&self) -> PathBuf {
        self.dir.join(self.params.buffer_file_name())
    }

    pub fn resume_path(&self) -> PathBuf {
        self.dir.join(self.params.resume_file_name())
    }

    /// Number of batch writes performed so far.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Encode the in-memory batch as one codec value and append it to the
    /// buffer file.
    fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = Value::List(self.batch.drain(..).map(|post| post.to_value()).collect());
        let bytes = codec::encode(&batch)?;

        if self.file.is_none() {
            std::fs::create_dir_all(&self.dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.buffer_path())?;
            self.file = Some(file);
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(&bytes)?;
            file.flush()?;
            self.flushes += 1;
        }
        Ok(())
    }

    /// Drive the crawl source under the retry policy. The source is
    /// rate-limited and intermittently fails, so the ceiling is large;
    /// the resume marker keeps retries from refetching finished pages.
    /// Skipped entirely in cached mode.
    pub async fn start_crawl(&mut self, source: &dyn CrawlSource) -> Result<()> {
        if self.params.only_cached {
            log::info!(
                "crawl for '{}' skipped, serving the existing buffer file",
                self.params.signature()
            );
            return Ok(());
        }

        std::fs::create_dir_all(&self.dir)?;
        let params = self.params.clone();
        let resume = self.resume_path();
        let policy = self.retry;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match source.fetch(&params, &resume, self).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < policy.max_attempts => {
                    log::warn!(
                        "crawl attempt {}/{} for '{}' failed: {}. Retrying in {:?}",
                        attempt,
                        policy.max_attempts,
                        params.signature(),
                        e,
                        policy.delay_for(attempt)
                    );
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Flush the remainder and release the file handle.
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.file = None;
        Ok(())
    }

    /// Close, then stream the buffer file back as decoded posts in append
    /// order. Single pass; reopening requires a new buffer. A missing
    /// buffer file replays as empty.
    pub fn replay(mut self) -> Result<Replay> {
        self.close()?;
        let path = self.buffer_path();
        let stream = match File::open(&path) {
            Ok(file) => Some(DecodeStream::new(BufReader::new(file))?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("no buffer file at {:?}, replaying empty", path);
                None
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Replay {
            stream,
            pending: VecDeque::new(),
            seen: self.seen,
        })
    }
}

impl PostSink for CrawlBuffer {
    fn append(&mut self, post: Post) -> Result<()> {
        self.batch.push(post);
        if self.batch.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }
}

/// Lazy replay of a buffer file.
pub struct Replay {
    stream: Option<DecodeStream<BufReader<File>>>,
    pending: VecDeque<Post>,
    seen: Option<SeenSet>,
}

impl Replay {
    fn is_seen(&self, id: &str) -> bool {
        let Some(set) = &self.seen else {
            return false;
        };
        set.contains(id).unwrap_or_else(|e| {
            log::warn!("seen lookup failed for '{id}': {e}. Treating as unseen");
            false
        })
    }
}

impl Iterator for Replay {
    type Item = Post;

    fn next(&mut self) -> Option<Post> {
        loop {
            if let Some(post) = self.pending.pop_front() {
                if self.is_seen(&post.id) {
                    continue;
                }
                return Some(post);
            }
            match self.stream.as_mut()?.next()?.scrub_nul() {
                Value::List(items) => self
                    .pending
                    .extend(items.into_iter().filter_map(Post::from_value)),
                item @ Value::Map(_) => {
                    if let Some(post) = Post::from_value(item) {
                        self.pending.push_back(post);
                    }
                }
                _ => {}
            }
        }
    }
}
