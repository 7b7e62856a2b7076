//! Record/replay infrastructure for deterministic testing.
//!
//! A cassette is a YAML file holding the interactions one run had with the
//! generation port, in call order.

pub mod recorder;
pub mod replayer;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use replayer::CassetteReplayer;

/// A recorded session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cassette {
    /// Human-readable cassette name.
    pub name: String,
    /// When the recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Commit of the code that made the recording.
    pub commit: String,
    /// Interactions in call order.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// One call through a port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Position in the recording.
    pub seq: u64,
    /// Port name, e.g. `image_generator`.
    pub port: String,
    /// Method name, e.g. `generate`.
    pub method: String,
    /// Serialized input.
    #[serde(default)]
    pub input: serde_json::Value,
    /// Serialized output using the `Ok`/`Err` convention.
    pub output: serde_json::Value,
}

/// Load a cassette file and create a replayer.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_cassette(path: &Path) -> Result<CassetteReplayer, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
    let cassette: Cassette = serde_yaml::from_str(&content)
        .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))?;
    Ok(CassetteReplayer::new(&cassette))
}
