//! Error types for butterfly-map
//!
//! Provides error handling for query building, backend calls and response repair.

use std::fmt;

/// Main error type for butterfly-map operations
#[derive(Debug)]
pub enum Error {
    /// Coordinate or bounding box data does not have the expected structure
    Shape(String),

    /// Backend response could not be parsed, even after repair
    MalformedResponse(String),

    /// Backend response parsed but lacks the expected fields
    UnexpectedShape(String),

    /// Invalid configuration or parameters
    InvalidInput(String),

    /// HTTP-specific error (non-success status, bad body)
    HttpError(String),

    /// Network connectivity issues
    NetworkError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Shape(msg) => {
                write!(f, "Shape error: {msg}")
            }
            Error::MalformedResponse(msg) => {
                write!(f, "Malformed response: {msg}")
            }
            Error::UnexpectedShape(msg) => {
                write!(f, "Unexpected response shape: {msg}")
            }
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {msg}")
            }
            Error::HttpError(msg) => {
                write!(f, "HTTP error: {msg}")
            }
            Error::NetworkError(msg) => {
                write!(f, "Network error: {msg}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::NetworkError(err.to_string())
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse(err.to_string())
    }
}

/// Convenience result type for butterfly-map operations
pub type Result<T> = std::result::Result<T, Error>;
