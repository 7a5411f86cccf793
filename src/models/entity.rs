// src/models/entity.rs

//! Crawled entities.

use serde::{Deserialize, Serialize};

/// A named entity whose timeline and mentions are crawled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Display name (e.g., "Acme Corp")
    pub name: String,

    /// Handle on the crawl source, without the "@"
    pub handle: String,

    /// Entity kind, used as the indexed source type (e.g., "organization")
    pub kind: String,
}

impl Entity {
    pub fn new(
        name: impl Into<String>,
        handle: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
            kind: kind.into(),
        }
    }
}
