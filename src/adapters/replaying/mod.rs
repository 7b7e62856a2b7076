//! Replaying adapters that serve recorded interactions from cassettes.

pub mod image_generator;

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;

/// Take the next recorded output for `port`/`method`.
pub(crate) fn next_output(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
) -> Result<serde_json::Value, String> {
    let mut guard = replayer.lock().unwrap_or_else(PoisonError::into_inner);
    guard.next_interaction(port, method).map(|i| i.output)
}

/// Decode a replayed output recorded with the `Ok`/`Err` convention.
///
/// A bare value without either key is treated as `Ok`.
pub(crate) fn replay_result<T: DeserializeOwned>(output: serde_json::Value) -> Result<T, String> {
    if let Some(err) = output.get("Err") {
        return Err(err.as_str().unwrap_or("replayed error").to_string());
    }
    let value = output.get("Ok").cloned().unwrap_or(output);
    serde_json::from_value(value).map_err(|e| format!("Malformed replayed output: {e}"))
}
