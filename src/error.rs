// src/error.rs

//! Unified error handling for the chronicle application.

use std::fmt;

use thiserror::Error;

/// Result type alias for chronicle operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Binary encoding failed
    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Binary decoding failed
    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// Disk set cache error
    #[error("Cache error: {0}")]
    Cache(#[from] sled::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Crawling error
    #[error("Crawl error for {context}: {message}")]
    Crawl { context: String, message: String },

    /// Search index error
    #[error("Index error: {0}")]
    Index(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a crawl error with context.
    pub fn crawl(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Crawl {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a search index error.
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index(message.into())
    }
}
