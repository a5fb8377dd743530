//! Advice lookup: disease/category label → candidate advice strings.
//!
//! The advice file is a JSON object keyed by label. Each value is either a
//! plain list of strings or an object with an `advice` list (other keys such
//! as `symptoms` are ignored):
//!
//! ```json
//! {
//!   "Flu": { "symptoms": ["fever", "cough"], "advice": ["Rest.", "Drink fluids."] },
//!   "Cold": ["Keep warm."]
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AdviceError {
    #[error("advice file not found: {0}")]
    NotFound(PathBuf),

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("advice JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("advice list for '{0}' is empty")]
    EmptyAdvice(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AdviceEntry {
    List(Vec<String>),
    Detailed { advice: Vec<String> },
}

impl AdviceEntry {
    fn into_advice(self) -> Vec<String> {
        match self {
            Self::List(v) | Self::Detailed { advice: v } => v,
        }
    }
}

/// Read-only advice table. Every label maps to at least one advice string.
#[derive(Debug, Clone, Default)]
pub struct AdviceTable {
    entries: HashMap<String, Vec<String>>,
}

impl AdviceTable {
    /// Load an advice file from disk.
    pub fn load(path: &Path) -> Result<Self, AdviceError> {
        if !path.exists() {
            return Err(AdviceError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| AdviceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json_str(&raw)?;
        info!(labels = table.len(), path = %path.display(), "loaded advice table");
        Ok(table)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, AdviceError> {
        let parsed: HashMap<String, AdviceEntry> = serde_json::from_str(raw)?;
        Self::from_map(
            parsed
                .into_iter()
                .map(|(label, entry)| (label, entry.into_advice()))
                .collect(),
        )
    }

    /// Build a table from an in-memory map, rejecting empty advice lists.
    pub fn from_map(entries: HashMap<String, Vec<String>>) -> Result<Self, AdviceError> {
        if let Some((label, _)) = entries.iter().find(|(_, advice)| advice.is_empty()) {
            return Err(AdviceError::EmptyAdvice(label.clone()));
        }
        Ok(Self { entries })
    }

    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.entries.get(label).map(Vec::as_slice)
    }

    /// Pick one advice string for `label` uniformly at random.
    ///
    /// Returns `None` when the label has no entry.
    pub fn choose<R: Rng + ?Sized>(&self, label: &str, rng: &mut R) -> Option<&str> {
        self.entries
            .get(label)
            .and_then(|advice| advice.choose(rng))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
