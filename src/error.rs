// src/error.rs

//! Unified error handling for the archiver application.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for archiver operations.
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

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A post record could not be read or written
    #[error("Record error for {path}: {message}")]
    Record { path: String, message: String },

    /// An external collaborator (archiver, fetcher, exporter) failed
    #[error("{context} failed: {message}")]
    Collaborator { context: String, message: String },
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

    /// Create a record error for the given path.
    pub fn record(path: &Path, message: impl fmt::Display) -> Self {
        Self::Record {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a collaborator error with context.
    pub fn collaborator(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Collaborator {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
