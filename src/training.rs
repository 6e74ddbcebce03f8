//! Corpus training: dataset discovery, legacy-encoded file reading, and line cleaning.
//!
//! A training root holds one subdirectory per dataset, each containing `.txt`
//! files with one message per line in code page 437. Files are read in name
//! order so a training run is reproducible.

use crate::error::TrainingError;
use crate::format::Formatter;

use codepage_437::CP437_CONTROL;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Datasets whose sentences are long and formulaic enough to warrant a
/// higher-order chain.
const HIGH_ORDER_DATASETS: &[&str] = &["prophet"];

const HIGH_ORDER: usize = 3;
const DEFAULT_ORDER: usize = 2;

/// Result of training on a single corpus file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Trained { file: String, lines: usize },
    Skipped { file: String, reason: String },
}

/// Summary of a full training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingReport {
    /// Dataset name, or `None` when the training root itself was used.
    pub dataset: Option<String>,
    pub state_size: usize,
    pub outcomes: Vec<FileOutcome>,
}

impl TrainingReport {
    pub fn new(dataset: Option<&str>, state_size: usize) -> Self {
        Self {
            dataset: dataset.map(str::to_string),
            state_size,
            outcomes: Vec::new(),
        }
    }

    /// Total lines folded into the model.
    pub fn lines_trained(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| match outcome {
                FileOutcome::Trained { lines, .. } => *lines,
                FileOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            FileOutcome::Skipped { file, reason } => Some((file.as_str(), reason.as_str())),
            FileOutcome::Trained { .. } => None,
        })
    }
}

/// Markov order used for a dataset.
pub fn state_size_for(dataset: Option<&str>) -> usize {
    match dataset {
        Some(name) if HIGH_ORDER_DATASETS.contains(&name) => HIGH_ORDER,
        _ => DEFAULT_ORDER,
    }
}

/// Directory holding `dataset`, or the root itself when no dataset is named.
pub fn resolve_dataset_dir(root: &Path, dataset: Option<&str>) -> Result<PathBuf, TrainingError> {
    let dir = match dataset {
        None => root.to_path_buf(),
        Some(name) if is_plain_name(name) => root.join(name),
        Some(name) => {
            return Err(TrainingError::DatasetNotFound {
                path: root.join(name).display().to_string(),
            });
        }
    };

    if !dir.is_dir() {
        return Err(TrainingError::DatasetNotFound {
            path: dir.display().to_string(),
        });
    }
    Ok(dir)
}

/// Corpus files in `dir`, sorted by name. With `only`, just that file name.
pub fn list_corpus_files(dir: &Path, only: Option<&str>) -> Result<Vec<PathBuf>, TrainingError> {
    let entries = std::fs::read_dir(dir).map_err(|source| TrainingError::Read {
        path: dir.display().to_string(),
        source: Arc::new(source),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && is_corpus_file(path))
        .filter(|path| match only {
            Some(wanted) => path.file_name().is_some_and(|name| name == wanted),
            None => true,
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Read one corpus file into cleaned, non-empty lines.
pub fn read_corpus_file(path: &Path, formatter: &dyn Formatter) -> Result<Vec<String>, TrainingError> {
    let text = read_cp437(path)?;
    let lines = corpus_lines(&text, formatter);

    if lines.is_empty() {
        return Err(TrainingError::EmptyCorpus);
    }
    Ok(lines)
}

/// Clean every non-blank line, dropping those that clean to nothing.
pub fn corpus_lines(text: &str, formatter: &dyn Formatter) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| formatter.clean(line, false))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Sorted names of the datasets under `root`.
pub fn list_datasets(root: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(names)
}

/// Number of non-blank lines in a corpus file.
pub fn count_corpus_lines(path: &Path) -> Result<usize, TrainingError> {
    Ok(read_cp437(path)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count())
}

/// Write a message history as `<root>/<dataset>/<file_name>.txt`, one message
/// per line. Characters with no code page 437 equivalent become `?`.
pub fn write_corpus(
    root: &Path,
    dataset: &str,
    file_name: &str,
    messages: &[String],
) -> Result<PathBuf, TrainingError> {
    let dir = root.join(dataset);
    let path = dir.join(format!("{file_name}.txt"));

    if !is_plain_name(dataset) || !is_plain_name(file_name) {
        return Err(TrainingError::InvalidName(path.display().to_string()));
    }

    let mut bytes = Vec::new();
    for message in messages {
        let flattened = message.split_whitespace().collect::<Vec<_>>().join(" ");
        if flattened.is_empty() {
            continue;
        }
        bytes.extend(
            flattened
                .chars()
                .map(|c| encode_cp437(c).unwrap_or(b'?')),
        );
        bytes.push(b'\n');
    }

    std::fs::create_dir_all(&dir)
        .and_then(|()| std::fs::write(&path, bytes))
        .map_err(|source| TrainingError::Write {
            path: path.display().to_string(),
            source: Arc::new(source),
        })?;

    tracing::info!(path = %path.display(), messages = messages.len(), "corpus written");
    Ok(path)
}

fn read_cp437(path: &Path) -> Result<String, TrainingError> {
    let bytes = std::fs::read(path).map_err(|source| TrainingError::Read {
        path: path.display().to_string(),
        source: Arc::new(source),
    })?;
    Ok(bytes.iter().map(|byte| CP437_CONTROL.decode(*byte)).collect())
}

/// The code page 437 byte for `c`, only when it decodes back to `c`.
/// The encoder's overlap table maps lookalikes such as `€` onto other glyphs.
fn encode_cp437(c: char) -> Option<u8> {
    CP437_CONTROL
        .encode(c)
        .filter(|&byte| CP437_CONTROL.decode(byte) == c)
}

fn is_corpus_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\'])
}
