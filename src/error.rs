//! Error types for the snapshot pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering a snapshot
#[derive(Error, Debug)]
pub enum Error {
    /// The source file could not be read
    #[error("Failed to read input: {0}")]
    InputReadError(String),

    /// The pretty-printer rejected the source
    #[error("Formatting failed: {0}")]
    FormatError(String),

    /// The headless render service failed
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Trim/border/encode of the captured image failed
    #[error("Image processing failed: {0}")]
    ImageError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Network error (stylesheet fetch). Never aborts a render.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

// headless_chrome reports failures as anyhow errors
#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::RenderError(err.to_string())
    }
}
