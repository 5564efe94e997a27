//! Error types for nodex
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! The variants follow the indexing error taxonomy:
//! - `Config`: raised while parsing a collection's index configuration,
//!   before any document is touched
//! - `Stream`: a single node event could not be delivered to an engine buffer
//!   (callers log and continue; it never blocks document storage)
//! - `Engine`: the underlying index engine resource is unavailable
//! - `Query`: a query handed to an engine entry point is malformed or unsupported

use std::io;
use thiserror::Error;

/// Result type alias for nodex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the nodex indexing framework
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations on index data directories)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Malformed or incomplete index configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A node event could not be delivered to an index buffer
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Index engine resource could not be opened, synced or removed
    #[error("Index engine error: {0}")]
    Engine(String),

    /// Malformed or unsupported query
    #[error("Query error: {0}")]
    Query(String),

    /// Named entity (document, collection, node, index) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Document lock could not be acquired in time
    #[error("Lock timeout on document {0}")]
    LockTimeout(String),

    /// Transaction was aborted before the operation completed
    #[error("Transaction {0} aborted")]
    TransactionAborted(u64),
}

impl Error {
    /// Configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Streaming error with the given message
    pub fn stream(msg: impl Into<String>) -> Self {
        Error::Stream(msg.into())
    }

    /// Engine error with the given message
    pub fn engine(msg: impl Into<String>) -> Self {
        Error::Engine(msg.into())
    }

    /// Query error with the given message
    pub fn query(msg: impl Into<String>) -> Self {
        Error::Query(msg.into())
    }

    /// Not-found error with the given message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Invalid operation with the given message
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Error::InvalidOperation(msg.into())
    }

    /// Whether this error is recoverable by the caller without reconfiguring
    /// the database (query errors and lock timeouts are, the rest are not).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Query(_) | Error::LockTimeout(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
