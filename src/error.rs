//! Unified error type for lookbook.

use thiserror::Error;

/// Errors that can occur while preparing or running a generation cycle.
#[derive(Debug, Error)]
pub enum StudioError {
    /// An uploaded file exceeds the size limit.
    #[error("File '{name}' is {size} bytes; the limit is {limit} bytes (15 MiB)")]
    FileTooLarge {
        /// File name as selected by the user.
        name: String,
        /// Actual size in bytes.
        size: usize,
        /// Maximum accepted size in bytes.
        limit: usize,
    },

    /// An uploaded file is not a PNG, JPEG, or WebP image.
    #[error("Unsupported file type '{mime_type}' for '{name}'. Valid: image/png, image/jpeg, image/webp")]
    UnsupportedMediaType {
        /// File name as selected by the user.
        name: String,
        /// The declared or detected MIME type.
        mime_type: String,
    },

    /// The aspect ratio string is not a pair of positive numbers.
    #[error("Invalid aspect ratio '{0}'. Expected W:H with positive numbers (e.g. 9:16)")]
    InvalidAspectRatio(String),

    /// The source image could not be decoded.
    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    /// The cropped image could not be encoded.
    #[error("Failed to encode image: {0}")]
    EncodeFailure(String),

    /// A mandatory upload slot is empty.
    #[error("Missing required input: {0} image. Upload a {0} photo first")]
    MissingRequiredInput(&'static str),

    /// A generation cycle is already in progress.
    #[error("A generation is already in progress")]
    GenerationInFlight,

    /// The generation call failed: the service rejected the request, the
    /// response was unusable, or the request never completed.
    #[error("API error ({status}): {message}")]
    RemoteGenerationFailure {
        /// HTTP status code, or 0 when no response was received.
        status: u16,
        /// Error message from the service.
        message: String,
    },

    /// There are no results to save.
    #[error("No generated images to save")]
    NoResults,

    /// A network error outside the generation call, such as downloading a
    /// result image.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No API key configured for the provider.
    #[error("No API key for {provider}. Set {env_var} or add it to config file.")]
    MissingApiKey {
        /// The provider name.
        provider: String,
        /// The environment variable name.
        env_var: String,
    },
}

/// Message shown when a failure carries no text of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "Image generation failed.";

impl StudioError {
    /// The message surfaced to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteGenerationFailure { message, .. } if message.trim().is_empty() => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            Self::RemoteGenerationFailure { status: 0, message } => message.clone(),
            other => other.to_string(),
        }
    }
}
