//! Configuration loading and validation.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// takebot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory holding one subdirectory per training dataset.
    pub training_root: PathBuf,

    /// Directory where serialized models are saved and loaded.
    pub model_root: PathBuf,

    /// Seconds between random-take sweeps over all guilds.
    pub random_tick_secs: u64,

    /// Defaults applied to every newly created guild bot.
    pub bot: BotDefaults,

    /// Probabilities driving the random branches of take generation.
    pub chances: ChanceConfig,

    /// Fixed text literals.
    pub text: TextConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            training_root: PathBuf::from("train"),
            model_root: PathBuf::from("models"),
            random_tick_secs: 30,
            bot: BotDefaults::default(),
            chances: ChanceConfig::default(),
            text: TextConfig::default(),
        }
    }
}

/// Per-guild behavior defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BotDefaults {
    /// Minimum minutes between random takes.
    pub random_wait_minutes: f64,

    /// Minimum minutes between replies to mentions.
    pub mention_wait_minutes: f64,

    /// Messages that must be observed between random takes.
    pub msgs_wait: u32,

    /// Sentences per rant.
    pub rant_size: usize,

    /// Chance (percent) that a random trigger posts a rant instead of a take.
    pub rant_chance_percent: f64,

    /// Capacity of the anti-repetition take history.
    pub max_previous_takes: usize,

    /// Capacity of the observed-message history used for seeding.
    pub max_recent_messages: usize,

    /// Sentences sampled by the readiness probe.
    pub readiness_sample: usize,

    /// Regeneration attempts before a duplicate take is accepted.
    pub unique_tries: usize,

    /// Attempts handed to the generator per sentence.
    pub generator_tries: usize,
}

impl Default for BotDefaults {
    fn default() -> Self {
        Self {
            random_wait_minutes: 5.0,
            mention_wait_minutes: 2.0,
            msgs_wait: 10,
            rant_size: 10,
            rant_chance_percent: 5.0,
            max_previous_takes: 20,
            max_recent_messages: 100,
            readiness_sample: 15,
            unique_tries: 20,
            generator_tries: 50,
        }
    }
}

/// Probabilities (0.0 - 1.0) for the random branches of take generation.
///
/// Tests pin these to 0.0 or 1.0 to force a branch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChanceConfig {
    /// Seed a proactive take from an observed message.
    pub seed_from_history: f64,

    /// Start a reply from a word of the message it answers.
    pub smart_reply: f64,

    /// Prefix "because" when answering a "why".
    pub because: f64,

    /// Prefix a yes/no filler when answering a yes/no question.
    pub yes_no: f64,
}

impl Default for ChanceConfig {
    fn default() -> Self {
        Self {
            seed_from_history: 0.8,
            smart_reply: 0.8,
            because: 0.8,
            yes_no: 0.8,
        }
    }
}

/// Fixed text literals used by generation and formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Corpus used to seed a freshly reset model.
    pub init_text: String,

    /// Substituted when the generator cannot produce a sentence.
    pub fallback: String,

    /// Signature appended to every post.
    pub suffix: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            init_text: "i am a bot".into(),
            fallback: "hmm".into(),
            suffix: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file (if present) and environment.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let config = if path.is_file() {
            Self::read_file(&path)?
        } else {
            tracing::debug!(path = %path.display(), "no config file found, using defaults");
            Self::default()
        };

        config.with_env_overrides().validated()
    }

    /// Load from a specific config file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        Self::read_file(path)?.with_env_overrides().validated()
    }

    /// Parse a TOML config document.
    pub fn from_toml(raw: &str, origin: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|source| {
            ConfigError::Parse {
                path: origin.to_string(),
                source: Box::new(source),
            }
            .into()
        })
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("takebot"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    fn read_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.display().to_string(),
            source: Arc::new(source),
        })?;

        Self::from_toml(&raw, &path.display().to_string())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(root) = std::env::var("TAKEBOT_TRAINING_ROOT") {
            self.training_root = PathBuf::from(root);
        }
        if let Ok(root) = std::env::var("TAKEBOT_MODEL_ROOT") {
            self.model_root = PathBuf::from(root);
        }
        if let Ok(suffix) = std::env::var("TAKEBOT_SUFFIX") {
            self.text.suffix = suffix;
        }
        self
    }

    /// Reject values the bot cannot operate with.
    pub fn validated(self) -> Result<Self> {
        let bot = &self.bot;

        for (name, minutes) in [
            ("bot.random_wait_minutes", bot.random_wait_minutes),
            ("bot.mention_wait_minutes", bot.mention_wait_minutes),
        ] {
            if !minutes.is_finite() || minutes < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be >= 0, got {minutes}")).into());
            }
        }

        if !(0.0..=100.0).contains(&bot.rant_chance_percent) {
            return Err(ConfigError::Invalid(format!(
                "bot.rant_chance_percent must be within 0-100, got {}",
                bot.rant_chance_percent
            ))
            .into());
        }

        if bot.max_previous_takes == 0 {
            return Err(ConfigError::Invalid("bot.max_previous_takes must be at least 1".into()).into());
        }

        let chances = &self.chances;
        for (name, chance) in [
            ("chances.seed_from_history", chances.seed_from_history),
            ("chances.smart_reply", chances.smart_reply),
            ("chances.because", chances.because),
            ("chances.yes_no", chances.yes_no),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(ConfigError::Invalid(format!("{name} must be within 0-1, got {chance}")).into());
            }
        }

        if self.text.init_text.trim().is_empty() {
            return Err(ConfigError::Invalid("text.init_text must contain at least one word".into()).into());
        }

        if self.random_tick_secs == 0 {
            return Err(ConfigError::Invalid("random_tick_secs must be at least 1".into()).into());
        }

        Ok(self)
    }
}
