//! Text → feature transforms paired with a trained classifier.
//!
//! The TF-IDF artifact mirrors a fitted scikit-learn `TfidfVectorizer`:
//!
//! ```json
//! {
//!   "vocabulary": {"fever": 0, "cough": 1, "sore throat": 2},
//!   "idf": [1.4, 1.2, 2.1],
//!   "lowercase": true,
//!   "ngram_range": [1, 2],
//!   "norm": "l2",
//!   "sublinear_tf": false
//! }
//! ```
//!
//! Tokens are maximal runs of word characters (alphanumeric or `_`) at least
//! two characters long; n-grams join consecutive tokens with a single space.
//! Whether a vectorizer matches the classifier it is served with is not
//! checked here.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::classifier::Features;

/// A fitted text-to-feature transform.
pub trait Vectorizer: Send + Sync {
    /// Map raw text into the paired classifier's feature space.
    fn transform(&self, text: &str) -> anyhow::Result<Features>;

    /// Output dimensionality.
    fn n_features(&self) -> usize;

    fn kind(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

fn default_true() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Fitted TF-IDF vectorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_true")]
    lowercase: bool,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default = "default_norm")]
    norm: Option<Norm>,
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default)]
    binary: bool,
    #[serde(default)]
    stop_words: Vec<String>,
}

impl TfidfVectorizer {
    /// Build a vectorizer with default options (lowercase, unigrams, l2 norm).
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> anyhow::Result<Self> {
        let v = Self {
            vocabulary,
            idf,
            lowercase: true,
            ngram_range: default_ngram_range(),
            norm: default_norm(),
            sublinear_tf: false,
            binary: false,
            stop_words: Vec::new(),
        };
        v.validate()?;
        Ok(v)
    }

    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> anyhow::Result<Self> {
        self.ngram_range = (min_n, max_n);
        self.validate()?;
        Ok(self)
    }

    pub fn with_norm(mut self, norm: Option<Norm>) -> Self {
        self.norm = norm;
        self
    }

    pub fn with_sublinear_tf(mut self, sublinear_tf: bool) -> Self {
        self.sublinear_tf = sublinear_tf;
        self
    }

    pub fn with_stop_words(mut self, stop_words: Vec<String>) -> Self {
        self.stop_words = stop_words;
        self
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let v: Self = serde_json::from_str(raw).context("parse tfidf vectorizer")?;
        v.validate()?;
        Ok(v)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let (min_n, max_n) = self.ngram_range;
        anyhow::ensure!(
            min_n >= 1 && min_n <= max_n,
            "invalid ngram_range ({min_n}, {max_n})"
        );
        anyhow::ensure!(!self.vocabulary.is_empty(), "vocabulary is empty");
        if let Some((term, &idx)) = self
            .vocabulary
            .iter()
            .find(|&(_, &idx)| idx >= self.idf.len())
        {
            anyhow::bail!(
                "vocabulary term '{term}' has index {idx} but idf has {} entries",
                self.idf.len()
            );
        }
        anyhow::ensure!(
            self.idf.iter().all(|w| w.is_finite()),
            "idf contains non-finite values"
        );
        Ok(())
    }

    /// Split text into word tokens, dropping stop words.
    fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|tok| tok.chars().count() >= 2)
            .filter(|tok| !self.stop_words.iter().any(|s| s == tok))
            .map(str::to_string)
            .collect()
    }

    /// Tokens expanded to every n-gram in `ngram_range`.
    fn terms(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }
}

impl Vectorizer for TfidfVectorizer {
    fn transform(&self, text: &str) -> anyhow::Result<Features> {
        // BTreeMap keeps the output indices ascending.
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.terms(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut weights: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| {
                let tf = if self.binary {
                    1.0
                } else if self.sublinear_tf {
                    1.0 + tf.ln()
                } else {
                    tf
                };
                (idx, tf * self.idf[idx])
            })
            .collect();

        let norm = match self.norm {
            Some(Norm::L2) => weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt(),
            Some(Norm::L1) => weights.iter().map(|(_, w)| w.abs()).sum::<f64>(),
            None => 1.0,
        };
        if norm > 0.0 {
            for (_, w) in &mut weights {
                *w /= norm;
            }
        }

        Ok(Features::Sparse {
            dim: self.idf.len(),
            entries: weights,
        })
    }

    fn n_features(&self) -> usize {
        self.idf.len()
    }

    fn kind(&self) -> &'static str {
        "tfidf"
    }
}
