//! Adapter implementations for port traits.
//!
//! - `live/`: Gemini and `OpenAI` HTTP clients
//! - `recording/`: wrap a live adapter and capture its interactions
//! - `replaying/`: serve captured interactions without network access

pub mod live;
pub mod recording;
pub mod replaying;
