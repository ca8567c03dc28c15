//! Error types for the alias directory
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

use crate::codec::CodecError;

/// Result type alias for alias directory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the alias directory
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O errors (config file, import document)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure (connection refused, reset, DNS)
    #[error("HTTP error: {0}")]
    Http(String),

    /// A remote call exceeded its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The remote store reported a server-side failure
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The remote store rejected a write because of a concurrent change
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The stored blob could not be decoded
    #[error("Alias directory unavailable: {0}")]
    DirectoryUnavailable(#[from] CodecError),

    /// Position does not exist in the directory that was read
    #[error("Index {index} out of range (directory has {len} aliases)")]
    IndexOutOfRange {
        /// Requested position
        index: usize,
        /// Directory length at read time
        len: usize,
    },

    /// The entry at a position is no longer the one the caller expected
    #[error("Entry {index} is now '{found}', expected '{expected}'")]
    StaleEntry {
        /// Requested position
        index: usize,
        /// Alias the caller saw
        expected: String,
        /// Alias found in the fresh read
        found: String,
    },

    /// Endpoint reference or label that does not resolve against the catalog
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// Alias or email that cannot be encoded
    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Store-specific error
    #[error("Store error ({store}): {message}")]
    Provider {
        /// Store name
        store: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an unknown endpoint error
    pub fn unknown_endpoint(msg: impl Into<String>) -> Self {
        Self::UnknownEndpoint(msg.into())
    }

    /// Create an invalid alias error
    pub fn invalid_alias(msg: impl Into<String>) -> Self {
        Self::InvalidAlias(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a store-specific error
    pub fn provider(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same call later may succeed
    ///
    /// Authentication, configuration and input errors are permanent; the
    /// caller has to change something before trying again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Timeout(_)
                | Self::Unavailable(_)
                | Self::RateLimited(_)
                | Self::Conflict(_)
        )
    }
}
