//! Image generator port for the remote generation service.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::StudioError;
use crate::payload::GenerationRequest;

/// Result images for one request, in the order the service returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Image locators: `data:` URIs or `http(s)` URLs.
    pub urls: Vec<String>,
}

/// Boxed future type returned by [`ImageGenerator::generate`].
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GenerationResult, StudioError>> + Send + 'a>>;

/// Generates composite images from a subject photo, references, and a prompt.
pub trait ImageGenerator: Send + Sync {
    /// Generate images for the given request.
    fn generate(&self, request: &GenerationRequest) -> GenerateFuture<'_>;
}

/// Turn a non-2xx response body into an error, preferring the service's
/// own `error.message` field when the body is JSON.
pub(crate) fn api_error(status: u16, body: &str) -> StudioError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string());
    StudioError::RemoteGenerationFailure { status, message }
}

/// A request that produced no usable response: connection, timeout, or
/// body read failures.
pub(crate) fn transport_error(err: &reqwest::Error) -> StudioError {
    StudioError::RemoteGenerationFailure {
        status: err.status().map_or(0, |s| s.as_u16()),
        message: err.to_string(),
    }
}

/// Error for a successful response that carried no images.
pub(crate) fn no_images_error(body: &str) -> StudioError {
    let truncated = if body.len() > 500 {
        let mut end = 500;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    };
    StudioError::RemoteGenerationFailure {
        status: 200,
        message: format!("No images in response. Body: {truncated}"),
    }
}
