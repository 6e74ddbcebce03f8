//! Statistical text generators.
//!
//! The bot treats a generator as an opaque model: it can be built from a
//! corpus, asked for a sentence, merged with another model of the same order,
//! and round-tripped through JSON. [`MarkovText`] is the built-in backend.

pub mod markov;
#[cfg(test)]
pub(crate) mod scripted;

pub use markov::MarkovText;

use crate::error::ModelError;
use rand::RngCore;

/// A generative text model.
pub trait TextGenerator: Send + Sized + 'static {
    /// Build a model of the given order from newline-free sentences.
    fn from_corpus(lines: &[String], state_size: usize) -> Result<Self, ModelError>;

    /// Markov order (words of context per step).
    fn state_size(&self) -> usize;

    /// Number of sentences folded into this model.
    fn sentence_count(&self) -> usize;

    /// Produce a sentence, making up to `tries` attempts.
    fn make_sentence(&self, rng: &mut dyn RngCore, tries: usize) -> Option<String>;

    /// Produce a sentence that passes through `start`. `None` when the model
    /// has never seen the word.
    fn make_sentence_with_start(
        &self,
        start: &str,
        rng: &mut dyn RngCore,
        tries: usize,
    ) -> Option<String>;

    /// Merge `other` into `self`. Both must share an order.
    fn absorb(&mut self, other: Self) -> Result<(), ModelError>;

    fn to_json(&self) -> Result<Vec<u8>, ModelError>;

    fn from_json(bytes: &[u8]) -> Result<Self, ModelError>;
}
