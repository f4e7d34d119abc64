//! Error types for slidewin.
//!
//! The limiter itself never fails; these errors come from loading and
//! validating configuration.

use thiserror::Error;

/// Main error type for slidewin operations.
#[derive(Error, Debug)]
pub enum SlidewinError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for slidewin operations.
pub type Result<T> = std::result::Result<T, SlidewinError>;
