//! Error types for batwatch
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::domain::ErrorKind;

/// All error types that can occur in batwatch
#[derive(Debug, Error)]
pub enum WatchError {
    /// Site label never appeared in the document
    #[error("Not found: {0}")]
    NotFound(String),

    /// Card located but no ratio with the expected denominator appeared
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Element reference invalidated by a re-render
    #[error("Stale element reference")]
    StaleReference,

    /// Session could not be established or released
    #[error("Session error: {0}")]
    Session(String),

    /// Document backend failed while reading an element
    #[error("Document error: {0}")]
    Document(String),

    /// Configuration is missing or invalid
    #[error("Config error: {0}")]
    Config(String),

    /// Site descriptor failed validation
    #[error("Invalid site: {0}")]
    InvalidSite(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl WatchError {
    /// Classify this error for reporting in a site result.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WatchError::NotFound(_) => ErrorKind::NotFound,
            WatchError::Timeout(_) => ErrorKind::Timeout,
            WatchError::Session(_) => ErrorKind::Session,
            _ => ErrorKind::Document,
        }
    }

    /// Whether the error only means the element must be re-queried
    pub fn is_stale(&self) -> bool {
        matches!(self, WatchError::StaleReference)
    }
}

/// Result type alias for batwatch operations
pub type Result<T> = std::result::Result<T, WatchError>;
