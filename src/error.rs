//! Error handling for framecipher
//!
//! This module defines the crate-level error type and a Result alias used by
//! configuration, media I/O and the CLI. Errors raised inside the running
//! pipeline live in [`crate::pipeline::PipelineError`] and convert into
//! [`FrameCipherError`] via `?`.

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for framecipher operations
#[derive(Error, Debug)]
pub enum FrameCipherError {
    /// Errors related to configuration loading/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or mismatched frame data
    #[error("Frame error: {0}")]
    Frame(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding/encoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors from a pipeline run
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FrameCipherError>,
    },
}

impl FrameCipherError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FrameCipherError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for framecipher operations
pub type Result<T> = std::result::Result<T, FrameCipherError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| FrameCipherError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| FrameCipherError::Io(e).with_context(f()))
    }
}
