// src/lib.rs

//! chronicle — crawl, buffer, and index social-media and news content.

pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;
