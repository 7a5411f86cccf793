// src/models/mod.rs

//! Domain models for the chronicle application.

mod entity;
mod job;
mod post;

pub use entity::Entity;
pub use job::{BOUND_FORMAT, CrawlFilters, CrawlParams};
pub use post::{Post, PostTime};
