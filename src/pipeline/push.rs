// src/pipeline/push.rs

//! Chunked bulk pusher.
//!
//! Takes a lazy sequence of indexable records, transforms each into its
//! wire document, and writes the result in fixed-size chunks with bounded
//! retries. Only one chunk is in memory at a time. A chunk that exhausts
//! its retries aborts the remaining chunks.

use std::time::Duration;

use crate::config::IndexConfig;
use crate::error::Result;
use crate::index::{BulkDoc, BulkSink, Indexable};
use crate::utils::iter::chunks;
use crate::utils::retry::{RetryPolicy, with_retry};

/// Totals across one push.
#[derive(Debug, Default, Clone, Copy)]
pub struct PushStats {
    pub chunks: usize,
    pub indexed: usize,
    pub duplicates: usize,
}

/// Writes record sequences to a bulk sink in retried chunks.
pub struct BulkPusher<'a> {
    sink: &'a dyn BulkSink,
    chunk_size: usize,
    timeout: Duration,
    policy: RetryPolicy,
}

impl<'a> BulkPusher<'a> {
    pub fn new(sink: &'a dyn BulkSink, config: &IndexConfig) -> Self {
        Self {
            sink,
            chunk_size: config.chunk_size,
            timeout: Duration::from_secs(config.bulk_timeout_secs),
            policy: RetryPolicy::fixed(
                config.bulk_attempts,
                Duration::from_secs(config.bulk_retry_delay_secs),
            ),
        }
    }

    /// Use the longer timeout meant for full-collection reindex runs.
    pub fn for_reindex(mut self, config: &IndexConfig) -> Self {
        self.timeout = Duration::from_secs(config.reindex_timeout_secs);
        self
    }

    /// Push every record, one chunk at a time.
    pub async fn push<I>(&self, records: I) -> Result<PushStats>
    where
        I: IntoIterator,
        I::Item: Indexable,
    {
        let docs = records
            .into_iter()
            .map(|record| BulkDoc::from_record(&record));

        let mut stats = PushStats::default();
        for chunk in chunks(docs, self.chunk_size) {
            let outcome =
                with_retry(&self.policy, || self.sink.bulk_write(&chunk, self.timeout)).await?;
            stats.chunks += 1;
            stats.indexed += outcome.indexed;
            stats.duplicates += outcome.duplicates;
            log::debug!(
                "pushed chunk {} ({} docs, {} duplicates)",
                stats.chunks,
                chunk.len(),
                outcome.duplicates
            );
        }
        Ok(stats)
    }
}
