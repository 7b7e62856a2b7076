//! Service context that bundles the generator port for one run.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::adapters::live::gemini::GeminiGenerator;
use crate::adapters::live::openai::OpenAiGenerator;
use crate::adapters::recording::image_generator::RecordingImageGenerator;
use crate::adapters::replaying::image_generator::ReplayingImageGenerator;
use crate::cassette::load_cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::replayer::CassetteReplayer;
use crate::config::Config;
use crate::error::StudioError;
use crate::model::Provider;
use crate::ports::ImageGenerator;

/// Bundles the port trait objects a run needs.
pub struct ServiceContext {
    /// Image generator port.
    pub generator: Box<dyn ImageGenerator>,
    /// HTTP client for everything else the run fetches, such as result images.
    pub client: reqwest::Client,
}

/// An HTTP client honoring `[network]` settings.
///
/// # Errors
///
/// Returns an error if the client cannot be built.
pub fn http_client(config: &Config) -> Result<reqwest::Client, StudioError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.network.timeout() {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Handle to a recording session that must be finished after use.
pub struct RecordingSession {
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Write the recorded cassette to disk.
    ///
    /// Call after every generator sharing the recorder has been dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder is still shared or the file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        let recorder = Arc::try_unwrap(self.recorder)
            .map_err(|_| "Recording adapter still has references".to_string())?
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        recorder.finish().map_err(|e| format!("Failed to write cassette: {e}"))
    }
}

impl ServiceContext {
    /// Create a live context for `model` on `provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not configured or the HTTP client
    /// cannot be built.
    pub fn live(provider: Provider, model: &str, config: &Config) -> Result<Self, StudioError> {
        let key = config.api_key(provider)?;

        let client = http_client(config)?;

        let generator: Box<dyn ImageGenerator> = match provider {
            Provider::Gemini => {
                Box::new(GeminiGenerator::new(client.clone(), key, model.to_string()))
            }
            Provider::OpenAi => {
                Box::new(OpenAiGenerator::new(client.clone(), key, model.to_string()))
            }
        };
        Ok(Self { generator, client })
    }

    /// Create a recording context that wraps a live adapter with a recorder.
    ///
    /// # Errors
    ///
    /// Returns an error if the live context cannot be created.
    pub fn recording(
        provider: Provider,
        model: &str,
        config: &Config,
    ) -> Result<(Self, RecordingSession), StudioError> {
        let live = Self::live(provider, model, config)?;

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let path = PathBuf::from(".lookbook/cassettes")
            .join(&timestamp)
            .join("image_generator.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            format!("{timestamp}-image_generator"),
            commit_hash(),
        )));

        let generator = RecordingImageGenerator::new(live.generator, Arc::clone(&recorder));
        Ok((Self { generator: Box::new(generator), client: live.client }, RecordingSession { recorder }))
    }

    /// Create a replaying context from a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be loaded or the HTTP
    /// client cannot be built.
    pub fn replaying(path: &Path, config: &Config) -> Result<Self, StudioError> {
        let replayer = load_cassette(path)
            .map_err(|e| StudioError::Config(format!("Failed to load cassette: {e}")))?;
        let generator = ReplayingImageGenerator::new(Arc::new(Mutex::new(replayer)));
        Ok(Self { generator: Box::new(generator), client: http_client(config)? })
    }

    /// Create a context for runs that never generate, such as prompt suggestion.
    ///
    /// Its generator replays an empty cassette, so any call fails as exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn offline(config: &Config) -> Result<Self, StudioError> {
        let replayer = Arc::new(Mutex::new(CassetteReplayer::default()));
        let generator = ReplayingImageGenerator::new(replayer);
        Ok(Self { generator: Box::new(generator), client: http_client(config)? })
    }
}

/// Current git commit hash, or "unknown" if unavailable.
fn commit_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}
