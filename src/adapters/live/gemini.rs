//! Live adapter for the Gemini image generation API.

use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

use crate::error::StudioError;
use crate::ingest::Upload;
use crate::options::Quality;
use crate::payload::GenerationRequest;
use crate::ports::image_generator::{
    api_error, no_images_error, transport_error, GenerateFuture, GenerationResult, ImageGenerator,
};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Live Gemini image generator that calls the Google AI API.
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    /// Create a new Gemini generator for `model` with the given API key.
    #[must_use]
    pub fn new(client: Client, api_key: String, model: String) -> Self {
        Self { client, api_key, model }
    }
}

/// Gemini only accepts 1K, 2K, and 4K output sizes.
fn image_size(quality: Quality) -> &'static str {
    match quality {
        Quality::Hd => "1K",
        Quality::TwoK => "2K",
        Quality::FourK | Quality::EightK => "4K",
    }
}

fn inline_part(upload: &Upload) -> serde_json::Value {
    serde_json::json!({
        "inlineData": {
            "mimeType": upload.file.mime_type,
            "data": base64::engine::general_purpose::STANDARD.encode(&upload.file.bytes),
        }
    })
}

/// Build the `generateContent` body: instructions, then each image preceded
/// by a text part naming its role.
fn request_body(request: &GenerationRequest) -> serde_json::Value {
    let options = &request.options;
    let styles: Vec<&str> = options.styles.iter().map(|s| s.label()).collect();
    let mut instructions = format!(
        "{}\nQuality: {}. Aspect ratio: {}.",
        request.prompt, options.quality, options.aspect
    );
    if !styles.is_empty() {
        instructions.push_str(&format!(" Styles: {}.", styles.join(", ")));
    }

    let mut parts = vec![
        serde_json::json!({ "text": instructions }),
        serde_json::json!({ "text": "Model photo:" }),
        inline_part(&request.cropped_model),
    ];
    for (role, upload) in request.auxiliary.iter() {
        parts.push(serde_json::json!({ "text": format!("Reference {role} image:") }));
        parts.push(inline_part(upload));
    }

    serde_json::json!({
        "contents": [{ "parts": parts }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "candidateCount": options.count(),
            "imageConfig": {
                "aspectRatio": options.aspect.as_str(),
                "imageSize": image_size(options.quality),
            }
        }
    })
}

impl ImageGenerator for GeminiGenerator {
    fn generate(&self, request: &GenerationRequest) -> GenerateFuture<'_> {
        let body = request_body(request);
        Box::pin(async move {
            let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.model);
            tracing::debug!(model = %self.model, "calling Gemini generateContent");

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| transport_error(&e))?;

            let status = response.status();
            let response_text = response.text().await.map_err(|e| transport_error(&e))?;

            if !status.is_success() {
                return Err(api_error(status.as_u16(), &response_text));
            }

            let parsed: GeminiResponse = serde_json::from_str(&response_text).map_err(|e| {
                StudioError::RemoteGenerationFailure {
                    status: 200,
                    message: format!("Failed to parse response: {e}"),
                }
            })?;

            let urls: Vec<String> = parsed
                .candidates
                .into_iter()
                .flat_map(|c| c.content.parts)
                .filter_map(|p| p.inline_data)
                .map(|inline| format!("data:{};base64,{}", inline.mime_type, inline.data))
                .collect();

            if urls.is_empty() {
                return Err(no_images_error(&response_text));
            }

            Ok(GenerationResult { urls })
        })
    }
}

// --- Gemini API response types ---

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    inline_data: Option<GeminiInlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}
