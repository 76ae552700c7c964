//! Error Handling Module
//!
//! Defines the error type for the CNN time-lapse library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for training and visualization operations
#[derive(Error, Debug)]
pub enum VisualizerError {
    /// Error loading or processing an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoadError(PathBuf, String),

    /// Error writing an image to disk
    #[error("Failed to save image at '{0}': {1}")]
    ImageSaveError(PathBuf, String),

    /// Error with dataset operations (missing or empty class folders, class mismatch)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// The held-out set has no samples, so accuracy is undefined
    #[error("Dataset at '{0}' contains no samples")]
    EmptyDataset(PathBuf),

    /// Error with model operations or tensor data extraction
    #[error("Model error: {0}")]
    Model(String),

    /// Error persisting or restoring model weights
    #[error("Checkpoint error at '{0}': {1}")]
    Checkpoint(PathBuf, String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rendering a snapshot or chart failed
    #[error("Render error: {0}")]
    Render(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Convenience Result type for library operations
pub type Result<T> = std::result::Result<T, VisualizerError>;

impl From<serde_json::Error> for VisualizerError {
    fn from(err: serde_json::Error) -> Self {
        VisualizerError::Serialization(err.to_string())
    }
}
