//! Inference layer: artifact-backed classifiers, text vectorizers, and the
//! request boundary that turns a JSON body into a ranked prediction.

pub mod artifacts;
pub mod classifier;
pub mod inference;
pub mod linear;
pub mod service;
pub mod vectorizer;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

pub use artifacts::{ArtifactError, Artifacts, ModelState};
pub use classifier::{Classifier, Features};
pub use inference::InferenceAdapter;
pub use linear::{LinearClassifier, Link};
pub use service::{Response, Service, StatusReport};
pub use vectorizer::{TfidfVectorizer, Vectorizer};
