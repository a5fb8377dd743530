pub mod advice;
pub mod config;
pub mod error;
pub mod input;
pub mod prediction;

pub use advice::{AdviceError, AdviceTable};
pub use config::{ArtifactPaths, ServiceConfig, Variant, DEFAULT_TOP_K};
pub use error::PredictError;
pub use input::SymptomInput;
pub use prediction::Prediction;
