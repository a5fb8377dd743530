//! Linear classifier artifact (logistic regression family).
//!
//! JSON layout, as exported from a fitted scikit-learn linear model:
//!
//! ```json
//! {
//!   "classes": ["Allergy", "Cold", "Flu"],
//!   "coef": [[0.1, -0.3], [0.0, 0.2], [1.2, 0.4]],
//!   "intercept": [-0.1, 0.0, 0.3],
//!   "link": "softmax"
//! }
//! ```
//!
//! One coefficient row per class, or a single row for a binary model whose
//! positive class is `classes[1]`. `link` selects how decision values become
//! probabilities: `softmax` (multinomial) or `ovr` (per-class sigmoid,
//! renormalised).

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, Features, ensure_dim};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Link {
    #[default]
    Softmax,
    Ovr,
}

#[derive(Deserialize)]
struct RawLinear {
    classes: Vec<String>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    #[serde(default)]
    link: Link,
}

/// Linear model over a dense or sparse feature space.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    classes: Vec<String>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    link: Link,
    dim: usize,
}

impl LinearClassifier {
    /// Build a classifier, checking that the weights are consistent with the
    /// class list.
    pub fn new(
        classes: Vec<String>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
        link: Link,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!classes.is_empty(), "class list is empty");
        for (i, class) in classes.iter().enumerate() {
            anyhow::ensure!(
                !classes[..i].contains(class),
                "duplicate class label '{class}'"
            );
        }

        let binary = classes.len() == 2 && coef.len() == 1;
        anyhow::ensure!(
            binary || coef.len() == classes.len(),
            "{} coefficient rows for {} classes",
            coef.len(),
            classes.len()
        );
        anyhow::ensure!(
            intercept.len() == coef.len(),
            "{} intercepts for {} coefficient rows",
            intercept.len(),
            coef.len()
        );

        let dim = coef.first().map(Vec::len).unwrap_or(0);
        anyhow::ensure!(dim > 0, "coefficient rows are empty");
        anyhow::ensure!(
            coef.iter().all(|row| row.len() == dim),
            "coefficient rows have differing widths"
        );
        anyhow::ensure!(
            coef.iter().flatten().chain(&intercept).all(|w| w.is_finite()),
            "weights contain non-finite values"
        );

        Ok(Self {
            classes,
            coef,
            intercept,
            link,
            dim,
        })
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let RawLinear {
            classes,
            coef,
            intercept,
            link,
        } = serde_json::from_str(raw).context("parse linear model")?;
        Self::new(classes, coef, intercept, link)
    }

    pub fn link(&self) -> Link {
        self.link
    }

    fn is_binary(&self) -> bool {
        self.coef.len() == 1 && self.classes.len() == 2
    }

    /// Raw decision values, one per coefficient row.
    pub fn decision_function(&self, features: &Features) -> anyhow::Result<Vec<f64>> {
        ensure_dim(self.dim, features)?;
        let scores: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| features.dot(row) + b)
            .collect();
        anyhow::ensure!(
            scores.iter().all(|z| z.is_finite()),
            "decision values overflowed: {scores:?}"
        );
        Ok(scores)
    }
}

impl Classifier for LinearClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.dim)
    }

    fn predict(&self, features: &Features) -> anyhow::Result<String> {
        let scores = self.decision_function(features)?;
        let idx = if self.is_binary() {
            usize::from(scores[0] > 0.0)
        } else {
            argmax(&scores)
        };
        Ok(self.classes[idx].clone())
    }

    fn predict_proba(&self, features: &Features) -> anyhow::Result<Vec<f64>> {
        let scores = self.decision_function(features)?;
        if self.is_binary() {
            let p = sigmoid(scores[0]);
            return Ok(vec![1.0 - p, p]);
        }
        Ok(match self.link {
            Link::Softmax => softmax(&scores),
            Link::Ovr => {
                let raw: Vec<f64> = scores.iter().map(|&z| sigmoid(z)).collect();
                let sum: f64 = raw.iter().sum();
                // Every sigmoid underflowed; rank by the decision values instead.
                if sum == 0.0 {
                    softmax(&scores)
                } else {
                    raw.into_iter().map(|p| p / sum).collect()
                }
            }
        })
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

/// Index of the first maximum.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
