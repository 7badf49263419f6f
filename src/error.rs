//! Error types for callguard.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallguardError {
    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Speech recognition errors
    #[error("Recognition model not found at {path}")]
    RecognitionModelNotFound { path: String },

    #[error("Recognition failed: {message}")]
    Recognition { message: String },

    // Classification errors
    #[error("Failed to load classifier model: {message}")]
    ClassifierLoad { message: String },

    #[error("Classification failed: {message}")]
    Classification { message: String },

    // Transcript/verdict persistence errors
    #[error("Failed to persist {kind} to {path}: {message}")]
    Storage {
        kind: &'static str,
        path: String,
        message: String,
    },

    // Lifecycle errors
    #[error("Audio source unavailable: a previous capture thread has not released it")]
    AudioSourceBusy,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CallguardError>;
