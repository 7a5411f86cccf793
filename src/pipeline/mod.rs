//! The crawl-buffer / dedup / bulk-indexing pipeline.
//!
//! - `buffer`: durable accumulation and replay of crawled posts
//! - `push`: chunked, retried bulk writes to the search index
//! - `crawl`: per-job orchestration with idempotent phase flags
//! - `source`: file-backed crawl source for operators and tests

pub mod buffer;
pub mod crawl;
pub mod push;
pub mod source;

pub use buffer::{CrawlBuffer, CrawlSource, PostSink, Replay};
pub use crawl::{CrawlContext, run_crawl};
pub use push::{BulkPusher, PushStats};
pub use source::JsonlSource;
