/// Result of one successful prediction.
///
/// `confidence` is always the score of `label`, which is always the first
/// entry of `top`. The wire shape depends on the deployed variant and is
/// built at the request boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
    /// Highest-scoring `(label, score)` pairs, descending.
    pub top: Vec<(String, f64)>,
    pub advice: Option<String>,
}

impl Prediction {
    /// Build a prediction from a non-empty descending ranking.
    ///
    /// Returns `None` when `ranked` is empty.
    pub fn from_ranked(ranked: Vec<(String, f64)>, top_k: usize) -> Option<Self> {
        let (label, confidence) = ranked.first().cloned()?;
        let mut top = ranked;
        top.truncate(top_k.max(1));
        Some(Self {
            label,
            confidence,
            top,
            advice: None,
        })
    }

    pub fn with_advice(mut self, advice: Option<String>) -> Self {
        self.advice = advice;
        self
    }
}
