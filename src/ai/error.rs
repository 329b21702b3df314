// src/ai/error.rs
//! Error types for hug generation.

/// Maximum length of an API error body kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// The three ways a generation attempt can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid configuration, detected before any network call.
    Configuration,
    /// Network failure or API-level rejection.
    Transport,
    /// The API answered but produced no usable image.
    EmptyResult,
}

/// Errors that can occur while generating an image.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Credential missing or configuration invalid.
    #[error("{0}")]
    Config(String),

    /// Network or HTTP transport error.
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Request or output was withheld by the safety filters.
    #[error("No image generated in the response (blocked: {0}).")]
    ContentBlocked(String),

    /// The response contained no inline image.
    #[error("No image generated in the response.")]
    NoImage,

    /// The inline image payload could not be decoded.
    #[error("generated image could not be decoded: {0}")]
    UnusableImage(String),

    /// JSON serialization/deserialization error.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    /// Classifies this error into one of the three failure kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Network(_) | Self::Api { .. } | Self::Json(_) => ErrorKind::Transport,
            Self::NoImage | Self::ContentBlocked(_) | Self::UnusableImage(_) => {
                ErrorKind::EmptyResult
            }
        }
    }
}

/// Reduces an API error body to something fit for a one-line banner.
///
/// Google wraps errors as `{"error": {"message": ...}}`; when that shape is
/// present only the message is kept. The result is capped in length.
pub fn sanitize_error_message(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    if message.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = message.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{}...", truncated)
    } else {
        message
    }
}
