//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    /// The input file cannot be used at all (unreadable, no header, missing columns)
    #[error("Source format error: {0}")]
    SourceFormat(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a source format error
    pub fn source_format(msg: impl Into<String>) -> Self {
        Self::SourceFormat(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
