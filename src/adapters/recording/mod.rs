//! Recording adapters that capture interactions to cassettes.

pub mod image_generator;

use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::cassette::recorder::CassetteRecorder;

/// Record a `Result<T, E>` interaction using the `Ok`/`Err` JSON convention.
///
/// A value that fails to serialize is logged and the interaction skipped;
/// recording never changes the outcome of the call it observes.
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: Display,
    I: Serialize,
{
    let output = match result {
        Ok(v) => serde_json::to_value(v).map(|inner| serde_json::json!({ "Ok": inner })),
        Err(e) => Ok(serde_json::json!({ "Err": e.to_string() })),
    };
    match (serde_json::to_value(input), output) {
        (Ok(input), Ok(output)) => {
            recorder.lock().unwrap_or_else(PoisonError::into_inner).record(port, method, input, output);
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(port, method, error = %e, "interaction not recorded");
        }
    }
}
