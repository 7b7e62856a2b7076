//! Model name resolution and provider detection.

/// Supported API providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Google Gemini API.
    Gemini,
    /// `OpenAI` API.
    OpenAi,
}

impl Provider {
    /// Display name and API key environment variable.
    #[must_use]
    pub fn key_source(self) -> (&'static str, &'static str) {
        match self {
            Self::Gemini => ("Gemini", "GEMINI_API_KEY"),
            Self::OpenAi => ("OpenAI", "OPENAI_API_KEY"),
        }
    }
}

/// Short name aliases for image models that accept reference images.
const ALIASES: &[(&str, &str)] = &[
    ("nano-banana", "gemini-2.5-flash-image"),
    ("nano-banana-pro", "gemini-3-pro-image-preview"),
    ("gpt-1", "gpt-image-1"),
    ("gpt-1-mini", "gpt-image-1-mini"),
];

/// Resolve a model name (alias or exact) to the full model identifier.
#[must_use]
pub fn resolve_model(name: &str) -> String {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or_else(|| name.to_string(), |(_, full)| (*full).to_string())
}

/// Detect the provider from a resolved model name.
///
/// # Errors
///
/// Returns an error if the model name doesn't match a known provider prefix.
pub fn detect_provider(model: &str) -> Result<Provider, String> {
    if model.starts_with("gemini") {
        Ok(Provider::Gemini)
    } else if model.starts_with("gpt-image") {
        Ok(Provider::OpenAi)
    } else {
        Err(format!("Unknown provider for model '{model}'. Expected 'gemini-*' or 'gpt-image-*'."))
    }
}
