//! Artifact loading at process start.
//!
//! Loading never aborts the process: any failure collapses into
//! [`ModelState::Unavailable`] with a reason, and every request served from
//! that state fails with "model unavailable" until the process is restarted
//! with fixed artifacts.
//!
//! Model formats, chosen by extension:
//!
//! - `.json` holding a linear model, or a text pipeline
//!   `{"vectorizer": {..}, "classifier": {..}}` that carries its own vectorizer
//! - `.onnx` (requires the `onnx` feature) with a sibling `classes.json`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use triage_core::{AdviceError, AdviceTable, ArtifactPaths, PredictError};

use crate::classifier::Classifier;
use crate::linear::LinearClassifier;
use crate::vectorizer::{TfidfVectorizer, Vectorizer};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("artifact corrupt or incompatible: {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("unsupported artifact format: {0}")]
    Unsupported(PathBuf),

    #[error("{path}: built without the `{feature}` feature")]
    FeatureDisabled { path: PathBuf, feature: &'static str },
}

impl ArtifactError {
    fn corrupt(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

/// Everything a prediction needs, immutable once built.
pub struct Artifacts {
    classifier: Box<dyn Classifier>,
    vectorizer: Option<Box<dyn Vectorizer>>,
    advice: Option<AdviceTable>,
}

impl Artifacts {
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self {
            classifier,
            vectorizer: None,
            advice: None,
        }
    }

    pub fn with_vectorizer(mut self, vectorizer: Box<dyn Vectorizer>) -> Self {
        self.vectorizer = Some(vectorizer);
        self
    }

    pub fn with_advice(mut self, advice: AdviceTable) -> Self {
        self.advice = Some(advice);
        self
    }

    /// Deserialize every configured artifact. All configured files are
    /// required; the first failure is returned.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let (classifier, embedded) = load_model(&paths.model)?;
        let mut artifacts = Self::new(classifier);

        match (&paths.vectorizer, embedded) {
            (Some(path), embedded) => {
                if embedded.is_some() {
                    warn!(
                        model = %paths.model.display(),
                        vectorizer = %path.display(),
                        "model embeds a vectorizer; using the configured one instead"
                    );
                }
                artifacts = artifacts.with_vectorizer(Box::new(load_vectorizer(path)?));
            }
            (None, Some(embedded)) => artifacts = artifacts.with_vectorizer(embedded),
            (None, None) => {}
        }

        if let Some(path) = &paths.advice {
            let table = AdviceTable::load(path).map_err(|e| match e {
                AdviceError::NotFound(p) => ArtifactError::NotFound(p),
                other => ArtifactError::corrupt(path, other),
            })?;
            artifacts = artifacts.with_advice(table);
        }

        Ok(artifacts)
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn vectorizer(&self) -> Option<&dyn Vectorizer> {
        self.vectorizer.as_deref()
    }

    pub fn advice(&self) -> Option<&AdviceTable> {
        self.advice.as_ref()
    }
}

/// Process-wide model state: loaded once, never swapped.
#[derive(Clone)]
pub enum ModelState {
    Loaded(Arc<Artifacts>),
    Unavailable(String),
}

impl ModelState {
    /// Load artifacts, recording any failure instead of returning it.
    pub fn load(paths: &ArtifactPaths) -> Self {
        match Artifacts::load(paths) {
            Ok(artifacts) => {
                let clf = artifacts.classifier();
                info!(
                    kind = clf.kind(),
                    classes = clf.classes().len(),
                    vectorizer = artifacts.vectorizer().map(|v| v.kind()).unwrap_or("none"),
                    advice_labels = artifacts.advice().map(AdviceTable::len).unwrap_or(0),
                    "model loaded"
                );
                Self::Loaded(Arc::new(artifacts))
            }
            Err(e) => {
                warn!(error = %e, "model unavailable; requests will fail until restart");
                Self::Unavailable(e.to_string())
            }
        }
    }

    pub fn loaded(artifacts: Artifacts) -> Self {
        Self::Loaded(Arc::new(artifacts))
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Self::Loaded(_) => None,
            Self::Unavailable(reason) => Some(reason.as_str()),
        }
    }

    /// Loaded artifacts, or the "model unavailable" failure.
    pub fn artifacts(&self) -> Result<&Arc<Artifacts>, PredictError> {
        match self {
            Self::Loaded(artifacts) => Ok(artifacts),
            Self::Unavailable(reason) => Err(PredictError::ModelUnavailable(reason.clone())),
        }
    }
}

// ── Format dispatch ──

type LoadedModel = (Box<dyn Classifier>, Option<Box<dyn Vectorizer>>);

fn load_model(path: &Path) -> Result<LoadedModel, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }

    match extension(path).as_deref() {
        Some("json") => load_json_model(path),
        Some("onnx") => load_onnx(path),
        _ => Err(ArtifactError::Unsupported(path.to_path_buf())),
    }
}

fn load_json_model(path: &Path) -> Result<LoadedModel, ArtifactError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ArtifactError::corrupt(path, e))?;
    let mut doc: Value =
        serde_json::from_str(&raw).map_err(|e| ArtifactError::corrupt(path, e))?;

    let is_pipeline = doc.get("vectorizer").is_some() && doc.get("classifier").is_some();
    if !is_pipeline {
        let clf: Box<dyn Classifier> = Box::new(
            LinearClassifier::from_json_str(&raw)
                .map_err(|e| ArtifactError::corrupt(path, format!("{e:#}")))?,
        );
        return Ok((clf, None));
    }

    let vectorizer = doc["vectorizer"].take().to_string();
    let classifier = doc["classifier"].take().to_string();
    let vec: Box<dyn Vectorizer> = Box::new(
        TfidfVectorizer::from_json_str(&vectorizer)
            .map_err(|e| ArtifactError::corrupt(path, format!("vectorizer: {e:#}")))?,
    );
    let clf: Box<dyn Classifier> = Box::new(
        LinearClassifier::from_json_str(&classifier)
            .map_err(|e| ArtifactError::corrupt(path, format!("classifier: {e:#}")))?,
    );
    Ok((clf, Some(vec)))
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path) -> Result<LoadedModel, ArtifactError> {
    let clf: Box<dyn Classifier> = Box::new(
        crate::onnx::OnnxClassifier::load(path)
            .map_err(|e| ArtifactError::corrupt(path, format!("{e:#}")))?,
    );
    Ok((clf, None))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path) -> Result<LoadedModel, ArtifactError> {
    Err(ArtifactError::FeatureDisabled {
        path: path.to_path_buf(),
        feature: "onnx",
    })
}

fn load_vectorizer(path: &Path) -> Result<TfidfVectorizer, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }
    if extension(path).as_deref() != Some("json") {
        return Err(ArtifactError::Unsupported(path.to_path_buf()));
    }
    TfidfVectorizer::load(path).map_err(|e| ArtifactError::corrupt(path, format!("{e:#}")))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LINEAR: &str = r#"{
        "classes": ["Flu", "Cold"],
        "coef": [[1.0, 0.0], [0.0, 1.0]],
        "intercept": [0.0, 0.0]
    }"#;

    const TFIDF: &str = r#"{"vocabulary": {"fever": 0, "sneezing": 1}, "idf": [1.0, 1.0]}"#;

    const ADVICE: &str = r#"{"Flu": ["Rest."], "Cold": {"advice": ["Keep warm."]}}"#;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_model_vectorizer_and_advice() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ArtifactPaths::new(write(tmp.path(), "model.json", LINEAR))
            .with_vectorizer(write(tmp.path(), "tfidf.json", TFIDF))
            .with_advice(write(tmp.path(), "diseases.json", ADVICE));

        let state = ModelState::load(&paths);
        assert!(state.is_loaded());
        let artifacts = state.artifacts().unwrap();
        assert_eq!(artifacts.classifier().classes(), ["Flu", "Cold"]);
        assert_eq!(artifacts.vectorizer().unwrap().n_features(), 2);
        assert_eq!(artifacts.advice().unwrap().len(), 2);
    }

    #[test]
    fn text_pipeline_carries_its_vectorizer() {
        let tmp = tempfile::TempDir::new().unwrap();
        let body = format!(r#"{{"vectorizer": {TFIDF}, "classifier": {LINEAR}}}"#);
        let paths = ArtifactPaths::new(write(tmp.path(), "pipeline.json", &body));

        let artifacts = Artifacts::load(&paths).unwrap();
        assert_eq!(artifacts.vectorizer().unwrap().kind(), "tfidf");
        assert_eq!(artifacts.classifier().kind(), "linear");
    }

    #[test]
    fn missing_model_is_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ArtifactPaths::new(tmp.path().join("model.json"));
        let err = Artifacts::load(&paths).err().unwrap();
        assert!(matches!(err, ArtifactError::NotFound(_)));

        let state = ModelState::load(&paths);
        assert!(!state.is_loaded());
        assert!(state.unavailable_reason().unwrap().contains("artifact not found"));
        assert!(matches!(
            state.artifacts().err().unwrap(),
            PredictError::ModelUnavailable(_)
        ));
    }

    #[test]
    fn corrupt_model_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ArtifactPaths::new(write(tmp.path(), "model.json", "{not json"));
        let err = Artifacts::load(&paths).err().unwrap();
        assert!(matches!(err, ArtifactError::Corrupt { .. }));
    }

    #[test]
    fn schema_mismatch_is_corrupt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let body = r#"{"classes": ["Flu"], "coef": [[1.0], [2.0]], "intercept": [0.0, 0.0]}"#;
        let paths = ArtifactPaths::new(write(tmp.path(), "model.json", body));
        let err = Artifacts::load(&paths).err().unwrap();
        assert!(err.to_string().contains("coefficient rows"), "{err}");
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ArtifactPaths::new(write(tmp.path(), "model.pkl", "binary"));
        let err = Artifacts::load(&paths).err().unwrap();
        assert!(matches!(err, ArtifactError::Unsupported(_)));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn onnx_without_feature() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ArtifactPaths::new(write(tmp.path(), "model.onnx", ""));
        let err = Artifacts::load(&paths).err().unwrap();
        assert!(err.to_string().contains("`onnx` feature"));
    }

    #[test]
    fn configured_advice_is_required() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ArtifactPaths::new(write(tmp.path(), "model.json", LINEAR))
            .with_advice(tmp.path().join("diseases.json"));
        let state = ModelState::load(&paths);
        assert!(!state.is_loaded());
        assert!(state.unavailable_reason().unwrap().contains("diseases.json"));
    }

    #[test]
    fn empty_advice_list_is_corrupt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ArtifactPaths::new(write(tmp.path(), "model.json", LINEAR))
            .with_advice(write(tmp.path(), "diseases.json", r#"{"Flu": []}"#));
        let err = Artifacts::load(&paths).err().unwrap();
        assert!(matches!(err, ArtifactError::Corrupt { .. }));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn broken_vectorizer_fails_the_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ArtifactPaths::new(write(tmp.path(), "model.json", LINEAR))
            .with_vectorizer(write(tmp.path(), "tfidf.json", r#"{"vocabulary": {}}"#));
        assert!(!ModelState::load(&paths).is_loaded());
    }
}
