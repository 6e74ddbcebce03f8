//! Word-level Markov chain backend.

use super::TextGenerator;
use crate::error::ModelError;

use rand::RngCore;
use rand::distr::Distribution as _;
use rand::distr::weighted::WeightedIndex;
use rand::seq::IndexedRandom as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Padding token marking the start of a sentence.
const BEGIN: &str = "___BEGIN__";
/// Follower token marking the end of a sentence.
const END: &str = "___END__";
/// Upper bound on words per generated sentence.
const MAX_WORDS: usize = 100;

/// Word transitions keyed by the preceding `state_size` words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkovText {
    state_size: usize,
    sentences: usize,
    /// State (words joined by a single space) -> next word -> count.
    chain: BTreeMap<String, BTreeMap<String, u32>>,
}

impl MarkovText {
    fn empty(state_size: usize) -> Self {
        Self {
            state_size: state_size.max(1),
            sentences: 0,
            chain: BTreeMap::new(),
        }
    }

    fn feed(&mut self, sentence: &str) {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.is_empty() {
            return;
        }

        let mut items = vec![BEGIN; self.state_size];
        items.extend(&words);
        items.push(END);

        for window in items.windows(self.state_size + 1) {
            let (state, next) = window.split_at(self.state_size);
            *self
                .chain
                .entry(state.join(" "))
                .or_default()
                .entry(next[0].to_string())
                .or_insert(0) += 1;
        }

        self.sentences += 1;
    }

    /// Follow transitions from `state` until the end marker or the word cap.
    fn walk(&self, mut state: Vec<String>, rng: &mut dyn RngCore) -> Vec<String> {
        let mut words = Vec::new();

        while words.len() < MAX_WORDS {
            let Some(followers) = self.chain.get(&state.join(" ")) else {
                break;
            };
            let Some(next) = pick_follower(followers, rng) else {
                break;
            };
            if next == END {
                break;
            }

            words.push(next.to_string());
            state.remove(0);
            state.push(next.to_string());
        }

        words
    }
}

fn pick_follower<'a>(followers: &'a BTreeMap<String, u32>, rng: &mut dyn RngCore) -> Option<&'a str> {
    let distribution = WeightedIndex::new(followers.values().copied()).ok()?;
    followers
        .keys()
        .nth(distribution.sample(rng))
        .map(String::as_str)
}

impl TextGenerator for MarkovText {
    fn from_corpus(lines: &[String], state_size: usize) -> Result<Self, ModelError> {
        let mut model = Self::empty(state_size);
        for line in lines {
            model.feed(line);
        }

        if model.sentences == 0 {
            return Err(ModelError::EmptyCorpus);
        }
        Ok(model)
    }

    fn state_size(&self) -> usize {
        self.state_size
    }

    fn sentence_count(&self) -> usize {
        self.sentences
    }

    fn make_sentence(&self, rng: &mut dyn RngCore, tries: usize) -> Option<String> {
        let opening = vec![BEGIN.to_string(); self.state_size];

        (0..tries.max(1))
            .map(|_| self.walk(opening.clone(), &mut *rng))
            .find(|words| !words.is_empty())
            .map(|words| words.join(" "))
    }

    fn make_sentence_with_start(
        &self,
        start: &str,
        rng: &mut dyn RngCore,
        tries: usize,
    ) -> Option<String> {
        let states: Vec<Vec<&str>> = self
            .chain
            .keys()
            .map(|key| key.split(' ').collect::<Vec<_>>())
            .filter(|words| words.last() == Some(&start))
            .collect();

        // Prefer states that open a sentence so the reply reads naturally.
        let openers: Vec<&Vec<&str>> = states
            .iter()
            .filter(|words| words[..words.len() - 1].iter().all(|w| *w == BEGIN))
            .collect();
        let candidates: Vec<&Vec<&str>> = if openers.is_empty() {
            states.iter().collect()
        } else {
            openers
        };

        for _ in 0..tries.max(1) {
            let state = candidates.choose(&mut *rng)?;
            let mut words: Vec<String> = state
                .iter()
                .filter(|w| **w != BEGIN)
                .map(|w| w.to_string())
                .collect();
            words.extend(self.walk(state.iter().map(|w| w.to_string()).collect(), &mut *rng));

            if !words.is_empty() {
                return Some(words.join(" "));
            }
        }

        None
    }

    fn absorb(&mut self, other: Self) -> Result<(), ModelError> {
        if other.state_size != self.state_size {
            return Err(ModelError::OrderMismatch {
                ours: self.state_size,
                other: other.state_size,
            });
        }

        for (state, followers) in other.chain {
            let entry = self.chain.entry(state).or_default();
            for (word, count) in followers {
                *entry.entry(word).or_insert(0) += count;
            }
        }
        self.sentences += other.sentences;

        Ok(())
    }

    fn to_json(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(self).map_err(|error| ModelError::Serialize(error.to_string()))
    }

    fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_slice(bytes)
            .map_err(|error| ModelError::Deserialize(error.to_string()))?;

        if model.state_size == 0 {
            return Err(ModelError::Deserialize("state_size must be at least 1".into()));
        }
        Ok(model)
    }
}
