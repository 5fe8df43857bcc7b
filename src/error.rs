//! Error types for xmlbind
//!
//! This module defines all error types used throughout the library.
//! Malformed input surfaces as [`SyntaxError`], version lookups that have no
//! matching declaration surface as [`Error::Schema`]. Unknown content is never
//! an error; it is preserved by the parser instead.

use std::fmt;
use thiserror::Error;

/// Result type alias using xmlbind Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlbind operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input could not be parsed as well-formed XML, including input bytes
    /// that are not valid in the detected encoding
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// The encoding declared by a document or requested for output is unsupported
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A schema declaration could not be resolved (bad version, bad reference)
    #[error("schema error: {0}")]
    Schema(String),

    /// Name error (malformed qualified name)
    #[error("name error: {0}")]
    Name(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// XML writer error
    #[error("XML error: {0}")]
    Xml(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while reading a schema catalog
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for the error returned when a version has no declared variant
    pub fn version_out_of_range(what: &str, version: u32, available: usize) -> Self {
        Error::Schema(format!(
            "version out of range: {} declares {} variant(s), version {} requested",
            what, available, version
        ))
    }
}

/// Malformed XML input
#[derive(Debug, Clone)]
pub struct SyntaxError {
    /// Error message
    pub message: String,
    /// Byte offset where the failure was detected
    pub position: Option<usize>,
    /// Underlying cause reported by the XML reader
    pub cause: Option<String>,
}

impl SyntaxError {
    /// Create a new syntax error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            cause: None,
        }
    }

    /// Set the position where parsing failed
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the underlying cause
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(position) = self.position {
            write!(f, " (at byte {})", position)?;
        }

        if let Some(ref cause) = self.cause {
            write!(f, "\n\nCause: {}", cause)?;
        }

        Ok(())
    }
}

impl std::error::Error for SyntaxError {}
