//! Request boundary: JSON body in, status code and JSON body out.
//!
//! This is what an HTTP layer calls once per request. Every failure is turned
//! into a structured payload here; nothing a single request sends can take
//! the process down.

use rand::Rng;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use triage_core::{
    ArtifactPaths, PredictError, Prediction, ServiceConfig, SymptomInput, Variant,
};

use crate::artifacts::ModelState;
use crate::inference::InferenceAdapter;

const UNAVAILABLE_MESSAGE: &str = "AI model is not available. Try again later.";
const RUNTIME_MESSAGE: &str =
    "Unable to process your symptoms. Please provide more details or try again.";
const INVALID_JSON_MESSAGE: &str = "Invalid JSON body";

/// HTTP-equivalent response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Body of the liveness/status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Loaded model state plus the request/response conventions of one variant.
///
/// Read-only after construction; share it behind an `Arc` across workers.
pub struct Service {
    state: ModelState,
    adapter: InferenceAdapter,
    variant: Variant,
}

impl Service {
    pub fn new(state: ModelState, config: ServiceConfig) -> Self {
        Self {
            state,
            adapter: InferenceAdapter::new(config.top_k),
            variant: config.variant,
        }
    }

    /// Load artifacts from `paths`. Never fails: a load error leaves the
    /// service answering "model unavailable".
    pub fn from_paths(paths: &ArtifactPaths, config: ServiceConfig) -> Self {
        Self::new(ModelState::load(paths), config)
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            status: "API is working",
            model_loaded: self.state.is_loaded(),
            reason: self.state.unavailable_reason().map(str::to_string),
        }
    }

    /// Run the adapter on already-decoded input.
    pub fn predict<R: Rng + ?Sized>(
        &self,
        input: &SymptomInput,
        rng: &mut R,
    ) -> Result<Prediction, PredictError> {
        self.adapter.predict(&self.state, input, rng)
    }

    /// Handle a raw request body.
    pub fn handle_json<R: Rng + ?Sized>(&self, raw: &str, rng: &mut R) -> Response {
        match serde_json::from_str::<Value>(raw) {
            Ok(body) => self.handle(&body, rng),
            Err(e) => {
                debug!(error = %e, "rejecting malformed request body");
                failure(&PredictError::InvalidInput(INVALID_JSON_MESSAGE.to_string()))
            }
        }
    }

    /// Handle a decoded request body.
    pub fn handle<R: Rng + ?Sized>(&self, body: &Value, rng: &mut R) -> Response {
        let result = SymptomInput::from_body(body, self.variant)
            .and_then(|input| self.predict(&input, rng));

        match result {
            Ok(prediction) => Response {
                status: 200,
                body: self.success_body(&prediction),
            },
            Err(err) => {
                if err.is_client_error() {
                    debug!(variant = %self.variant, error = %err, "invalid request");
                } else {
                    warn!(variant = %self.variant, error = %err, "prediction request failed");
                }
                failure(&err)
            }
        }
    }

    /// Success payload for `prediction`, keyed for this service's variant.
    pub fn success_body(&self, prediction: &Prediction) -> Value {
        let (label_key, ranking_key) = self.variant.result_keys();
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(true));
        body.insert(label_key.into(), json!(prediction.label));
        body.insert("confidence".into(), json!(prediction.confidence));
        body.insert(ranking_key.into(), json!(prediction.top));
        if let Some(advice) = &prediction.advice {
            body.insert("recommended_advice".into(), json!(advice));
        }
        if self.variant == Variant::Chat {
            body.insert(
                "response".into(),
                json!(format!(
                    "Based on your symptoms, you might have {}. Please consult a doctor.",
                    prediction.label
                )),
            );
        }
        Value::Object(body)
    }
}

fn failure(err: &PredictError) -> Response {
    let body = match err {
        PredictError::InvalidInput(message) => json!({
            "success": false,
            "message": message,
        }),
        PredictError::ModelUnavailable(_) => json!({
            "success": false,
            "error": err.to_string(),
            "message": UNAVAILABLE_MESSAGE,
        }),
        PredictError::Prediction(detail) => json!({
            "success": false,
            "error": detail,
            "message": RUNTIME_MESSAGE,
        }),
    };
    Response {
        status: err.status_code(),
        body,
    }
}
