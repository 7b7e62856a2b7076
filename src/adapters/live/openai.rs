//! Live adapter for the `OpenAI` image edit API.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::error::StudioError;
use crate::ingest::Upload;
use crate::options::Quality;
use crate::payload::GenerationRequest;
use crate::ports::image_generator::{
    api_error, no_images_error, transport_error, GenerateFuture, GenerationResult, ImageGenerator,
};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/images/edits";

/// Live `OpenAI` image generator that calls the `OpenAI` Images edit API.
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    /// Create a new `OpenAI` generator for `model` with the given API key.
    #[must_use]
    pub fn new(client: Client, api_key: String, model: String) -> Self {
        Self { client, api_key, model }
    }
}

/// Translate an aspect ratio string to `OpenAI` pixel dimensions.
///
/// `OpenAI` supports: `1024x1024`, `1536x1024`, `1024x1536`, `auto`.
#[must_use]
pub fn aspect_ratio_to_openai_size(ratio: &str) -> &'static str {
    match ratio {
        "1:1" => "1024x1024",
        "16:9" => "1536x1024",
        "9:16" => "1024x1536",
        _ => "auto",
    }
}

fn openai_quality(quality: Quality) -> &'static str {
    match quality {
        Quality::Hd => "medium",
        Quality::TwoK | Quality::FourK | Quality::EightK => "high",
    }
}

fn image_part(upload: &Upload) -> Result<Part, StudioError> {
    Ok(Part::bytes(upload.file.bytes.clone())
        .file_name(upload.file.name.clone())
        .mime_str(&upload.file.mime_type)
        .map_err(|e| transport_error(&e))?)
}

/// Build the multipart form. The subject image is always the first `image[]`.
fn request_form(model: &str, request: &GenerationRequest) -> Result<Form, StudioError> {
    let options = &request.options;
    let styles: Vec<&str> = options.styles.iter().map(|s| s.label()).collect();
    let mut prompt = request.prompt.clone();
    if !styles.is_empty() {
        prompt.push_str(&format!(". Styles: {}", styles.join(", ")));
    }

    let mut form = Form::new()
        .text("model", model.to_string())
        .text("prompt", prompt)
        .text("n", options.count().to_string())
        .text("size", aspect_ratio_to_openai_size(options.aspect.as_str()))
        .text("quality", openai_quality(options.quality))
        .part("image[]", image_part(&request.cropped_model)?);
    for (_, upload) in request.auxiliary.iter() {
        form = form.part("image[]", image_part(upload)?);
    }
    Ok(form)
}

impl ImageGenerator for OpenAiGenerator {
    fn generate(&self, request: &GenerationRequest) -> GenerateFuture<'_> {
        let form = request_form(&self.model, request);
        Box::pin(async move {
            let form = form?;
            tracing::debug!(model = %self.model, "calling OpenAI images/edits");

            let response = self
                .client
                .post(OPENAI_API_URL)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .multipart(form)
                .send()
                .await
                .map_err(|e| transport_error(&e))?;

            let status = response.status();
            let response_text = response.text().await.map_err(|e| transport_error(&e))?;

            if !status.is_success() {
                return Err(api_error(status.as_u16(), &response_text));
            }

            let parsed: OpenAiResponse = serde_json::from_str(&response_text).map_err(|e| {
                StudioError::RemoteGenerationFailure {
                    status: 200,
                    message: format!("Failed to parse response: {e}"),
                }
            })?;

            let urls: Vec<String> = parsed
                .data
                .into_iter()
                .filter_map(|item| match (item.b64_json, item.url) {
                    (Some(b64), _) => Some(format!("data:image/png;base64,{b64}")),
                    (None, url) => url,
                })
                .collect();

            if urls.is_empty() {
                return Err(no_images_error(&response_text));
            }

            Ok(GenerationResult { urls })
        })
    }
}

// --- OpenAI API response types ---

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    data: Vec<OpenAiImageData>,
}

#[derive(Deserialize)]
struct OpenAiImageData {
    b64_json: Option<String>,
    url: Option<String>,
}
