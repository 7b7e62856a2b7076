//! `config.toml` loading: API keys, option defaults, and HTTP settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::StudioError;
use crate::model::Provider;

/// Parsed `config.toml`. Every table is optional.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// `[keys]`: provider API keys.
    #[serde(default)]
    pub keys: KeysConfig,
    /// `[defaults]`: option values used when a CLI flag is absent.
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// `[network]`: HTTP client settings.
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Provider API keys from the file. Environment variables take precedence.
#[derive(Debug, Default, Deserialize)]
pub struct KeysConfig {
    /// Google Gemini key.
    pub gemini: Option<String>,
    /// `OpenAI` key.
    pub openai: Option<String>,
}

/// Fallback option values.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Model name or alias.
    pub model: String,
    /// One of the offered aspect ratios.
    pub aspect: String,
    /// Quality tier label.
    pub quality: String,
    /// Requested image count, clamped on use.
    pub count: i64,
    /// Style labels selected up front.
    pub styles: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: "nano-banana".into(),
            aspect: "9:16".into(),
            quality: "8K".into(),
            count: 2,
            styles: vec!["Chuyên nghiệp".into()],
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Default, Deserialize)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds. Unset or zero waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl NetworkConfig {
    /// The configured request timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }
}

impl Config {
    /// Read `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Config`] if the file exists but cannot be read
    /// or is not valid TOML for this layout.
    pub fn load(path: &Path) -> Result<Self, StudioError> {
        match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text)
                .map_err(|e| StudioError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(StudioError::Config(format!("{}: {e}", path.display()))),
        }
    }

    /// The API key for `provider`: its environment variable when set and
    /// non-empty, otherwise the `[keys]` entry.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::MissingApiKey`] when neither source has a key.
    pub fn api_key(&self, provider: Provider) -> Result<String, StudioError> {
        let (name, env_var) = provider.key_source();
        let from_file = match provider {
            Provider::Gemini => self.keys.gemini.as_ref(),
            Provider::OpenAi => self.keys.openai.as_ref(),
        };
        std::env::var(env_var)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| from_file.cloned())
            .ok_or_else(|| StudioError::MissingApiKey {
                provider: name.into(),
                env_var: env_var.into(),
            })
    }
}

/// Where to read the config from: `--config`, then `LOOKBOOK_CONFIG`, then
/// `~/.config/lookbook/config.toml`.
#[must_use]
pub fn discover_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit.map(PathBuf::from) {
        return path;
    }
    if let Some(path) = std::env::var_os("LOOKBOOK_CONFIG") {
        return PathBuf::from(path);
    }
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from("lookbook.toml"),
        |home| PathBuf::from(home).join(".config/lookbook/config.toml"),
    )
}
