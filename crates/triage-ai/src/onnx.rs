//! ONNX Runtime classifier for models exported with a probability tensor.
//!
//! The model directory must contain the `.onnx` file and a sibling
//! `classes.json`:
//!
//! ```json
//! {"classes": ["Allergy", "Cold", "Flu"], "input": "float_input", "probability_output": 1}
//! ```
//!
//! The model takes a float tensor `[1, n_features]` and emits probabilities
//! `[1, n_classes]` at output index `probability_output` (the layout of a
//! scikit-learn export with the zipmap disabled).

use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tracing::info;

use crate::classifier::{Classifier, Features, ensure_dim};

fn default_input() -> String {
    "float_input".to_string()
}

fn default_probability_output() -> usize {
    1
}

#[derive(Deserialize)]
struct OnnxMeta {
    classes: Vec<String>,
    #[serde(default = "default_input")]
    input: String,
    #[serde(default = "default_probability_output")]
    probability_output: usize,
    n_features: Option<usize>,
}

/// Classifier backed by an ONNX Runtime session.
///
/// `Session::run` needs exclusive access, so the session sits behind a mutex;
/// concurrent requests serialise on it.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    classes: Vec<String>,
    input: String,
    output_name: String,
    n_features: Option<usize>,
}

impl OnnxMeta {
    /// Check the metadata against the session's output names.
    fn output_name(&self, outputs: &[String]) -> anyhow::Result<String> {
        anyhow::ensure!(!self.classes.is_empty(), "classes.json lists no classes");
        outputs.get(self.probability_output).cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "probability_output {} out of range: model has {} outputs",
                self.probability_output,
                outputs.len()
            )
        })
    }
}

impl OnnxClassifier {
    /// Load `model_path` and the `classes.json` next to it.
    pub fn load(model_path: &Path) -> anyhow::Result<Self> {
        let meta_path = model_path.with_file_name("classes.json");
        anyhow::ensure!(
            meta_path.exists(),
            "classes.json not found next to {}",
            model_path.display()
        );
        let meta: OnnxMeta = serde_json::from_str(
            &std::fs::read_to_string(&meta_path)
                .with_context(|| format!("read {}", meta_path.display()))?,
        )
        .context("parse classes.json")?;

        let session = Session::builder()?.commit_from_file(model_path)?;
        let outputs: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        let output_name = meta.output_name(&outputs)?;

        info!(
            classes = meta.classes.len(),
            model = %model_path.display(),
            "loaded onnx classifier"
        );
        Ok(Self {
            session: Mutex::new(session),
            classes: meta.classes,
            input: meta.input,
            output_name,
            n_features: meta.n_features,
        })
    }

    fn run(&self, features: &Features) -> anyhow::Result<Vec<f64>> {
        if let Some(dim) = self.n_features {
            ensure_dim(dim, features)?;
        }
        let dense = narrow(&features.to_dense())?;
        let shape = [1i64, dense.len() as i64];
        let tensor = Tensor::from_array((shape, dense.into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("onnx session lock poisoned"))?;
        let outputs = session.run(ort::inputs![self.input.as_str() => tensor])?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            anyhow::anyhow!("model produced no output named '{}'", self.output_name)
        })?;
        let (output_shape, data) = output.try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 2 && dims[0] == 1 && dims[1] as usize == self.classes.len(),
            "unexpected probability shape: {dims:?}, expected [1, {}]",
            self.classes.len()
        );
        Ok(data.iter().map(|&p| p as f64).collect())
    }
}

/// Narrow to the f32 tensor the session takes, rejecting values that would
/// overflow to infinity.
fn narrow(values: &[f64]) -> anyhow::Result<Vec<f32>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            anyhow::ensure!(
                v.is_finite() && v.abs() <= f32::MAX as f64,
                "feature {i} ({v}) does not fit in a 32-bit float"
            );
            Ok(v as f32)
        })
        .collect()
}

impl Classifier for OnnxClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict(&self, features: &Features) -> anyhow::Result<String> {
        let proba = self.run(features)?;
        let mut best = 0;
        for (i, &p) in proba.iter().enumerate() {
            if p > proba[best] {
                best = i;
            }
        }
        Ok(self.classes[best].clone())
    }

    fn predict_proba(&self, features: &Features) -> anyhow::Result<Vec<f64>> {
        self.run(features)
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("models")
            .join("onnx")
            .join("model.onnx")
    }

    #[test]
    fn missing_classes_json_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = match OnnxClassifier::load(&tmp.path().join("model.onnx")) {
            Ok(_) => panic!("expected load failure"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("classes.json not found"));
    }

    fn meta(raw: &str) -> OnnxMeta {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn probability_output_must_exist() {
        let m = meta(r#"{"classes": ["Flu", "Cold"]}"#);
        let single = vec!["probabilities".to_string()];
        let err = m.output_name(&single).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");

        let pair = vec!["label".to_string(), "probabilities".to_string()];
        assert_eq!(m.output_name(&pair).unwrap(), "probabilities");

        let m = meta(r#"{"classes": ["Flu"], "probability_output": 0}"#);
        assert_eq!(m.output_name(&single).unwrap(), "probabilities");
    }

    #[test]
    fn empty_class_list_rejected() {
        let m = meta(r#"{"classes": []}"#);
        assert!(m.output_name(&["p".to_string()]).is_err());
    }

    #[test]
    fn narrowing_rejects_overflow() {
        assert_eq!(narrow(&[1.0, -2.5]).unwrap(), vec![1.0f32, -2.5]);
        let err = narrow(&[0.0, 1e39]).unwrap_err();
        assert!(err.to_string().contains("feature 1"), "{err}");
    }

    #[test]
    fn load_and_score() {
        let path = model_path();
        if !path.exists() {
            eprintln!("skipping: no ONNX model at {}", path.display());
            return;
        }
        let clf = OnnxClassifier::load(&path).unwrap();
        let dim = clf.n_features().unwrap_or(1);
        let proba = clf.predict_proba(&Features::Dense(vec![0.0; dim])).unwrap();
        assert_eq!(proba.len(), clf.classes().len());
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-3);
    }
}
