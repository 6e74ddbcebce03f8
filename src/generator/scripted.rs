//! Deterministic generator for tests: replays its corpus in order, forever.

use super::TextGenerator;
use crate::error::ModelError;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Serialize, Deserialize)]
pub struct ScriptedGenerator {
    state_size: usize,
    lines: Vec<String>,
    #[serde(skip)]
    cursor: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            state_size: 2,
            lines: lines.iter().map(|line| line.to_string()).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Calls to `make_sentence` so far.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl TextGenerator for ScriptedGenerator {
    fn from_corpus(lines: &[String], state_size: usize) -> Result<Self, ModelError> {
        if lines.is_empty() {
            return Err(ModelError::EmptyCorpus);
        }
        Ok(Self {
            state_size,
            lines: lines.to_vec(),
            cursor: AtomicUsize::new(0),
        })
    }

    fn state_size(&self) -> usize {
        self.state_size
    }

    fn sentence_count(&self) -> usize {
        self.lines.len()
    }

    fn make_sentence(&self, _rng: &mut dyn RngCore, _tries: usize) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        let line = &self.lines[index % self.lines.len()];
        (!line.is_empty()).then(|| line.clone())
    }

    fn make_sentence_with_start(
        &self,
        start: &str,
        _rng: &mut dyn RngCore,
        _tries: usize,
    ) -> Option<String> {
        self.lines
            .iter()
            .find(|line| line.split_whitespace().any(|word| word == start))
            .cloned()
    }

    fn absorb(&mut self, other: Self) -> Result<(), ModelError> {
        if other.state_size != self.state_size {
            return Err(ModelError::OrderMismatch {
                ours: self.state_size,
                other: other.state_size,
            });
        }
        self.lines.extend(other.lines);
        Ok(())
    }

    fn to_json(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(self).map_err(|error| ModelError::Serialize(error.to_string()))
    }

    fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        serde_json::from_slice(bytes).map_err(|error| ModelError::Deserialize(error.to_string()))
    }
}
