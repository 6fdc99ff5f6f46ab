//! Error types for dropcue.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DropcueError {
    // Audio input errors
    #[error("Malformed audio input: {message}")]
    BadAudio { message: String },

    #[error("Unsupported audio format: {message}")]
    UnsupportedFormat { message: String },

    // Speech-to-text errors
    #[error("Speech-to-text unavailable: {message}")]
    SttUnavailable { message: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DropcueError>;
