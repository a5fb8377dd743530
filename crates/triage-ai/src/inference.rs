//! Inference adapter: raw input → ranked, advice-augmented prediction.

use rand::Rng;
use tracing::{debug, warn};
use triage_core::{DEFAULT_TOP_K, PredictError, Prediction, SymptomInput};

use crate::artifacts::{Artifacts, ModelState};
use crate::classifier::Features;

/// Scores this far outside [0, 1] are rejected rather than clamped.
const PROBA_TOLERANCE: f64 = 1e-6;

/// Stateless adapter from one request's input to a [`Prediction`].
#[derive(Debug, Clone, Copy)]
pub struct InferenceAdapter {
    top_k: usize,
}

impl Default for InferenceAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

impl InferenceAdapter {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Validate `input`, then predict against `state`.
    ///
    /// Validation runs first: empty input is reported as such even when the
    /// model is unavailable, and never reaches the classifier.
    pub fn predict<R: Rng + ?Sized>(
        &self,
        state: &ModelState,
        input: &SymptomInput,
        rng: &mut R,
    ) -> Result<Prediction, PredictError> {
        input.validate()?;
        let artifacts = state.artifacts()?;
        self.predict_with(artifacts, input, rng)
    }

    /// Predict against already-loaded artifacts.
    pub fn predict_with<R: Rng + ?Sized>(
        &self,
        artifacts: &Artifacts,
        input: &SymptomInput,
        rng: &mut R,
    ) -> Result<Prediction, PredictError> {
        input.validate()?;

        let features = match input {
            SymptomInput::Text(text) => {
                let vectorizer = artifacts.vectorizer().ok_or_else(|| {
                    PredictError::Prediction("text input requires a vectorizer".to_string())
                })?;
                vectorizer.transform(text).map_err(runtime)?
            }
            SymptomInput::Features(values) => Features::Dense(values.clone()),
        };

        let clf = artifacts.classifier();
        let predicted = clf.predict(&features).map_err(runtime)?;
        let scores = clf.predict_proba(&features).map_err(runtime)?;

        let ranked = rank(clf.classes(), scores, &predicted)?;
        let prediction = Prediction::from_ranked(ranked, self.top_k).ok_or_else(|| {
            PredictError::Prediction("classifier reported no classes".to_string())
        })?;

        let advice = artifacts.advice().and_then(|table| {
            let pick = table.choose(&prediction.label, rng);
            if pick.is_none() {
                debug!(label = %prediction.label, "no advice for predicted label");
            }
            pick.map(str::to_string)
        });

        debug!(
            label = %prediction.label,
            confidence = prediction.confidence,
            input = input.kind(),
            nnz = features.nnz(),
            "prediction"
        );
        Ok(prediction.with_advice(advice))
    }
}

fn runtime(err: anyhow::Error) -> PredictError {
    PredictError::Prediction(format!("{err:#}"))
}

/// Pair scores with class labels and sort descending.
///
/// The sort is stable, so equal scores keep class-list order, except that
/// `predicted` is moved to the front when it ties with the top score. If
/// `predicted` scores strictly below the top, the ranking wins.
fn rank(
    classes: &[String],
    scores: Vec<f64>,
    predicted: &str,
) -> Result<Vec<(String, f64)>, PredictError> {
    if scores.len() != classes.len() {
        return Err(PredictError::Prediction(format!(
            "classifier returned {} scores for {} classes",
            scores.len(),
            classes.len()
        )));
    }
    if let Some(bad) = scores
        .iter()
        .find(|s| !s.is_finite() || **s < -PROBA_TOLERANCE || **s > 1.0 + PROBA_TOLERANCE)
    {
        return Err(PredictError::Prediction(format!(
            "classifier returned an invalid probability: {bad}"
        )));
    }

    let mut ranked: Vec<(String, f64)> = classes
        .iter()
        .cloned()
        .zip(scores.into_iter().map(|s| s.clamp(0.0, 1.0)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    if let Some(top) = ranked.first().map(|(_, s)| *s)
        && ranked[0].0 != predicted
    {
        match ranked.iter().position(|(label, _)| label == predicted) {
            Some(pos) if ranked[pos].1 == top => {
                let entry = ranked.remove(pos);
                ranked.insert(0, entry);
            }
            _ => warn!(
                predicted,
                top_label = %ranked[0].0,
                "predict disagrees with predict_proba; using highest score"
            ),
        }
    }

    Ok(ranked)
}
