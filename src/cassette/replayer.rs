//! Replays recorded interactions from a cassette.

use std::collections::{HashMap, VecDeque};

use super::{Cassette, Interaction};

/// Serves a cassette's interactions in order, one queue per port/method pair.
#[derive(Debug, Default)]
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Interaction>> = HashMap::new();
        let mut interactions = cassette.interactions.clone();
        interactions.sort_by_key(|i| i.seq);
        for interaction in interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction);
        }
        Self { queues }
    }

    /// Take the next interaction for `port`/`method`.
    ///
    /// # Errors
    ///
    /// Returns a description of what is left when nothing remains for the pair.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Result<Interaction, String> {
        let key = (port.to_string(), method.to_string());
        if let Some(interaction) = self.queues.get_mut(&key).and_then(VecDeque::pop_front) {
            return Ok(interaction);
        }
        let mut remaining: Vec<String> = self
            .queues
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|((p, m), q)| format!("{p}::{m} ({})", q.len()))
            .collect();
        remaining.sort();
        Err(format!(
            "Cassette exhausted: no interactions left for {port}::{method}. Remaining: [{}]",
            remaining.join(", ")
        ))
    }
}
