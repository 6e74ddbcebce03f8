//! Model: a text generator plus the seeding, fallback, and persistence policy around it.

use crate::config::Config;
use crate::error::ModelError;
use crate::format::Formatter;
use crate::generator::{MarkovText, TextGenerator};

use rand::seq::SliceRandom as _;
use rand::{Rng as _, RngCore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Knobs for sentence production.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Corpus a fresh model starts from.
    pub init_text: String,
    /// Returned when the generator has nothing to say.
    pub fallback: String,
    /// Chance a seeded request actually tries the seed's words.
    pub smart_reply_chance: f64,
    /// Attempts handed to the generator per sentence.
    pub tries: usize,
}

impl ModelSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            init_text: config.text.init_text.clone(),
            fallback: config.text.fallback.clone(),
            smart_reply_chance: config.chances.smart_reply,
            tries: config.bot.generator_tries,
        }
    }
}

/// A guild's language model.
pub struct Model<G: TextGenerator = MarkovText> {
    generator: G,
    settings: ModelSettings,
    formatter: Arc<dyn Formatter>,
}

impl<G: TextGenerator> Model<G> {
    /// A minimal model of the given order, trained only on the init text.
    pub fn new(
        state_size: usize,
        settings: ModelSettings,
        formatter: Arc<dyn Formatter>,
    ) -> Result<Self, ModelError> {
        let generator = G::from_corpus(&[settings.init_text.clone()], state_size)?;
        Ok(Self::from_generator(generator, settings, formatter))
    }

    pub fn from_generator(generator: G, settings: ModelSettings, formatter: Arc<dyn Formatter>) -> Self {
        Self {
            generator,
            settings,
            formatter,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn state_size(&self) -> usize {
        self.generator.state_size()
    }

    pub fn sentence_count(&self) -> usize {
        self.generator.sentence_count()
    }

    /// Generate a sentence, optionally steered by the words of `seed`.
    ///
    /// Seed words are stripped of filler, shuffled, and tried one at a time as
    /// a starting point. Falls back to an unseeded sentence, then to the
    /// configured fallback text.
    pub fn make_sentence(&self, seed: Option<&str>, rng: &mut dyn RngCore) -> String {
        let tries = self.settings.tries;

        if let Some(message) = seed
            && rng.random_bool(self.settings.smart_reply_chance)
        {
            let mut words = self
                .formatter
                .remove_filler_words(message.split(' ').map(String::from).collect());
            words.shuffle(&mut *rng);

            for word in &words {
                if let Some(sentence) = self.generator.make_sentence_with_start(word, &mut *rng, tries) {
                    return sentence;
                }
            }
        }

        self.generator
            .make_sentence(rng, tries)
            .unwrap_or_else(|| self.settings.fallback.clone())
    }

    /// Fold new sentences into the model.
    pub fn update(&mut self, lines: &[String]) -> Result<(), ModelError> {
        let addition = G::from_corpus(lines, self.state_size())?;
        self.generator.absorb(addition)
    }

    /// Write the model to `<model_root>/<name>.json`.
    pub fn save(&self, model_root: &Path, name: &str) -> Result<PathBuf, ModelError> {
        let path = model_path(model_root, name)?;
        let bytes = self.generator.to_json()?;

        std::fs::create_dir_all(model_root)
            .and_then(|()| std::fs::write(&path, bytes))
            .map_err(|source| ModelError::Save {
                path: path.display().to_string(),
                source: Arc::new(source),
            })?;

        tracing::info!(path = %path.display(), "model saved");
        Ok(path)
    }

    /// Replace the generator with `<model_root>/<name>.json`. On failure the
    /// current generator is kept.
    pub fn load(&mut self, model_root: &Path, name: &str) -> Result<PathBuf, ModelError> {
        let path = model_path(model_root, name)?;
        let bytes = std::fs::read(&path).map_err(|source| ModelError::Load {
            path: path.display().to_string(),
            source: Arc::new(source),
        })?;

        self.generator = G::from_json(&bytes)?;

        tracing::info!(path = %path.display(), state_size = self.state_size(), "model loaded");
        Ok(path)
    }
}

/// Names of models saved under `model_root`, sorted.
pub fn list_saved(model_root: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in std::fs::read_dir(model_root)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json")
            && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
        {
            names.push(stem.to_string());
        }
    }

    names.sort();
    Ok(names)
}

fn model_path(model_root: &Path, name: &str) -> Result<PathBuf, ModelError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\']);
    if !valid {
        return Err(ModelError::InvalidName(name.to_string()));
    }
    Ok(model_root.join(format!("{name}.json")))
}
