// src/storage/mod.rs

//! Persistent state: the disk set cache and the job store.

pub mod jobs;
pub mod seen;

pub use jobs::{JobState, JobStore};
pub use seen::{FileSeenSource, SeenCaches, SeenSet, SeenSource};
