//! Top-level error types for takebot.

use std::sync::Arc;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Bot(#[from] BotError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config from {path}: {source}")]
    Load {
        path: String,
        source: Arc<std::io::Error>,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: Box<toml::de::Error>,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Corpus training errors.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("dataset not found: {path}")]
    DatasetNotFound { path: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: Arc<std::io::Error>,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: Arc<std::io::Error>,
    },

    #[error("invalid corpus path: {0}")]
    InvalidName(String),

    #[error("no usable lines in corpus")]
    EmptyCorpus,

    #[error("training task failed: {0}")]
    TaskFailed(String),
}

/// Text model construction and persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("corpus produced no sentences")]
    EmptyCorpus,

    #[error("cannot merge a model of order {other} into one of order {ours}")]
    OrderMismatch { ours: usize, other: usize },

    #[error("failed to serialize model: {0}")]
    Serialize(String),

    #[error("failed to deserialize model: {0}")]
    Deserialize(String),

    #[error("failed to save model to {path}: {source}")]
    Save {
        path: String,
        source: Arc<std::io::Error>,
    },

    #[error("failed to load model from {path}: {source}")]
    Load {
        path: String,
        source: Arc<std::io::Error>,
    },

    #[error("invalid model name: {0:?}")]
    InvalidName(String),
}

/// Errors raised by per-guild bot operations.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("invalid value for {name}: {value}")]
    InvalidSetting { name: &'static str, value: String },

    #[error("message task failed: {0}")]
    TaskFailed(String),
}
