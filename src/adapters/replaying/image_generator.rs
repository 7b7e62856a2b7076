//! Replaying adapter for the `ImageGenerator` port.

use std::sync::{Arc, Mutex};

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::StudioError;
use crate::payload::GenerationRequest;
use crate::ports::image_generator::{GenerateFuture, GenerationResult, ImageGenerator};

/// Serves recorded generation results from a cassette.
pub struct ReplayingImageGenerator {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingImageGenerator {
    /// Create a replaying generator backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl ImageGenerator for ReplayingImageGenerator {
    fn generate(&self, _request: &GenerationRequest) -> GenerateFuture<'_> {
        let result = next_output(&self.replayer, "image_generator", "generate")
            .and_then(replay_result::<GenerationResult>)
            .map_err(|message| StudioError::RemoteGenerationFailure { status: 0, message });
        Box::pin(async move { result })
    }
}
