//! Shared configuration: where artifacts live and which request shape to speak.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of ranked candidates returned when nothing else is configured.
pub const DEFAULT_TOP_K: usize = 3;

/// Deployed request/response shape.
///
/// | variant     | request body                 |
/// |-------------|------------------------------|
/// | `diagnosis` | `{"symptoms": "<text>"}`     |
/// | `symptom`   | `{"text": "<text>"}`         |
/// | `chat`      | `{"symptoms": [<numbers>]}`  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Free-text symptoms → disease, with advice.
    #[default]
    Diagnosis,
    /// Free-text description → symptom label.
    Symptom,
    /// Pre-vectorized symptom array → disease.
    Chat,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagnosis => "diagnosis",
            Self::Symptom => "symptom",
            Self::Chat => "chat",
        }
    }

    /// Request body field carrying the input.
    pub fn input_field(&self) -> &'static str {
        match self {
            Self::Diagnosis | Self::Chat => "symptoms",
            Self::Symptom => "text",
        }
    }

    /// Whether the input is a numeric feature array rather than free text.
    pub fn expects_features(&self) -> bool {
        matches!(self, Self::Chat)
    }

    /// Message returned when the input field is empty or missing.
    pub fn missing_input_message(&self) -> &'static str {
        match self {
            Self::Diagnosis => "Please provide symptom description",
            Self::Symptom => "No text provided",
            Self::Chat => "No symptoms provided",
        }
    }

    /// Response keys for the predicted label and the ranked candidates.
    pub fn result_keys(&self) -> (&'static str, &'static str) {
        match self {
            Self::Diagnosis | Self::Chat => ("predicted_disease", "top_diseases"),
            Self::Symptom => ("predicted_symptom", "top_symptoms"),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diagnosis" => Ok(Self::Diagnosis),
            "symptom" => Ok(Self::Symptom),
            "chat" => Ok(Self::Chat),
            other => Err(format!(
                "unknown variant '{other}' (expected diagnosis, symptom or chat)"
            )),
        }
    }
}

/// Filesystem locations of the artifacts loaded at startup.
///
/// `vectorizer` and `advice` are optional; when set they are required to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub vectorizer: Option<PathBuf>,
    pub advice: Option<PathBuf>,
}

impl ArtifactPaths {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            vectorizer: None,
            advice: None,
        }
    }

    pub fn with_vectorizer(mut self, path: impl Into<PathBuf>) -> Self {
        self.vectorizer = Some(path.into());
        self
    }

    pub fn with_advice(mut self, path: impl Into<PathBuf>) -> Self {
        self.advice = Some(path.into());
        self
    }
}

/// Request-boundary settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub variant: Variant,
    pub top_k: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_parses_case_insensitively() {
        assert_eq!("Diagnosis".parse::<Variant>(), Ok(Variant::Diagnosis));
        assert_eq!(" chat ".parse::<Variant>(), Ok(Variant::Chat));
        assert_eq!("SYMPTOM".parse::<Variant>(), Ok(Variant::Symptom));
        assert!("triage".parse::<Variant>().is_err());
    }

    #[test]
    fn variant_fields() {
        assert_eq!(Variant::Diagnosis.input_field(), "symptoms");
        assert_eq!(Variant::Symptom.input_field(), "text");
        assert!(Variant::Chat.expects_features());
        assert!(!Variant::Diagnosis.expects_features());
        assert_eq!(
            Variant::Symptom.result_keys(),
            ("predicted_symptom", "top_symptoms")
        );
    }

    #[test]
    fn service_config_defaults() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.variant, Variant::Diagnosis);
        assert_eq!(cfg.top_k, 3);
    }

    #[test]
    fn artifact_paths_builder() {
        let paths = ArtifactPaths::new("m.json")
            .with_vectorizer("v.json")
            .with_advice("diseases.json");
        assert_eq!(paths.model, PathBuf::from("m.json"));
        assert_eq!(paths.vectorizer, Some(PathBuf::from("v.json")));
        assert_eq!(paths.advice, Some(PathBuf::from("diseases.json")));
    }
}
