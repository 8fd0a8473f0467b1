//! Error types for qqwry.

use std::net::Ipv4Addr;

use thiserror::Error;

/// Error type for qqwry operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Address text is not a dotted-quad IPv4 address
    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    /// IO error (open, mmap, positioned read)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural violation inside the database file
    #[error("malformed database: {0}")]
    MalformedDatabase(String),

    /// Address lies below the first indexed range
    #[error("address {0} is not covered by the database")]
    NotFound(Ipv4Addr),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Global database not initialized
    #[error("database not initialized")]
    NotInitialized,
}

impl Error {
    /// Shorthand for building a `MalformedDatabase` error.
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedDatabase(msg.into())
    }

    /// True for the expected "below coverage" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias for qqwry operations.
pub type Result<T> = std::result::Result<T, Error>;
