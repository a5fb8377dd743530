//! Raw request input and its decoding from a JSON body.

use serde_json::Value;

use crate::config::Variant;
use crate::error::PredictError;

/// One request's raw input, before any feature transform.
#[derive(Debug, Clone, PartialEq)]
pub enum SymptomInput {
    /// Free-text symptom description.
    Text(String),
    /// Pre-vectorized features in the classifier's native space.
    Features(Vec<f64>),
}

impl SymptomInput {
    /// Decode the variant's input field from a request body.
    ///
    /// An absent, null, or blank field (empty string, whitespace, empty
    /// array, `false`, `0`) is a validation failure. A present value of the
    /// wrong type is a [`PredictError::Prediction`]: the caller sent
    /// something, the model just cannot consume it.
    pub fn from_body(body: &Value, variant: Variant) -> Result<Self, PredictError> {
        let missing = || PredictError::InvalidInput(variant.missing_input_message().to_string());

        let value = match body.get(variant.input_field()) {
            Some(v) if !is_blank(v) => v,
            _ => return Err(missing()),
        };

        if variant.expects_features() {
            decode_features(value).map(Self::Features)
        } else {
            match value {
                Value::String(s) => Ok(Self::Text(s.trim().to_string())),
                other => Err(PredictError::Prediction(format!(
                    "unknown input type: expected text, got {}",
                    json_type(other)
                ))),
            }
        }
    }

    /// Reject empty input before it can reach a classifier.
    pub fn validate(&self) -> Result<(), PredictError> {
        match self {
            Self::Text(s) if s.trim().is_empty() => Err(PredictError::InvalidInput(
                "symptom description is empty".to_string(),
            )),
            Self::Features(f) if f.is_empty() => Err(PredictError::InvalidInput(
                "feature vector is empty".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Features(_) => "features",
        }
    }
}

fn decode_features(value: &Value) -> Result<Vec<f64>, PredictError> {
    let items = value.as_array().ok_or_else(|| {
        PredictError::Prediction(format!(
            "unknown input type: expected a numeric array, got {}",
            json_type(value)
        ))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_f64().ok_or_else(|| {
                PredictError::Prediction(format!(
                    "unknown input type: element {i} is {}, expected a number",
                    json_type(item)
                ))
            })
        })
        .collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_from_symptoms_field() {
        let input =
            SymptomInput::from_body(&json!({"symptoms": " fever, cough "}), Variant::Diagnosis)
                .unwrap();
        assert_eq!(input, SymptomInput::Text("fever, cough".into()));
    }

    #[test]
    fn text_from_text_field() {
        let input =
            SymptomInput::from_body(&json!({"text": "my head hurts"}), Variant::Symptom).unwrap();
        assert_eq!(input, SymptomInput::Text("my head hurts".into()));
    }

    #[test]
    fn empty_body_is_validation_failure() {
        let err = SymptomInput::from_body(&json!({}), Variant::Diagnosis).unwrap_err();
        assert_eq!(
            err,
            PredictError::InvalidInput("Please provide symptom description".into())
        );
    }

    #[test]
    fn blank_values_are_validation_failures() {
        for body in [
            json!({"symptoms": ""}),
            json!({"symptoms": "   "}),
            json!({"symptoms": null}),
            json!({"symptoms": []}),
        ] {
            let err = SymptomInput::from_body(&body, Variant::Diagnosis).unwrap_err();
            assert!(err.is_client_error(), "{body} should be a client error");
        }
    }

    #[test]
    fn non_object_body_is_missing_input() {
        let err = SymptomInput::from_body(&json!("fever"), Variant::Symptom).unwrap_err();
        assert_eq!(err, PredictError::InvalidInput("No text provided".into()));
    }

    #[test]
    fn wrong_type_is_runtime_failure() {
        let err = SymptomInput::from_body(&json!({"symptoms": 42}), Variant::Diagnosis)
            .unwrap_err();
        assert!(matches!(err, PredictError::Prediction(ref m) if m.contains("got number")));
    }

    #[test]
    fn features_from_chat_body() {
        let input =
            SymptomInput::from_body(&json!({"symptoms": [1, 0, 0.5]}), Variant::Chat).unwrap();
        assert_eq!(input, SymptomInput::Features(vec![1.0, 0.0, 0.5]));
    }

    #[test]
    fn large_features_keep_full_precision() {
        let input =
            SymptomInput::from_body(&json!({"symptoms": [1e39, -1e300]}), Variant::Chat).unwrap();
        assert_eq!(input, SymptomInput::Features(vec![1e39, -1e300]));
    }

    #[test]
    fn chat_rejects_empty_and_non_numeric() {
        let err = SymptomInput::from_body(&json!({"symptoms": []}), Variant::Chat).unwrap_err();
        assert_eq!(err, PredictError::InvalidInput("No symptoms provided".into()));

        let err = SymptomInput::from_body(&json!({"symptoms": [1, "cough"]}), Variant::Chat)
            .unwrap_err();
        assert!(matches!(err, PredictError::Prediction(ref m) if m.contains("element 1")));

        let err =
            SymptomInput::from_body(&json!({"symptoms": "cough"}), Variant::Chat).unwrap_err();
        assert!(matches!(err, PredictError::Prediction(_)));
    }

    #[test]
    fn validate_rejects_empty() {
        assert!(SymptomInput::Text(" ".into()).validate().is_err());
        assert!(SymptomInput::Features(vec![]).validate().is_err());
        assert!(SymptomInput::Text("rash".into()).validate().is_ok());
        assert!(SymptomInput::Features(vec![1.0]).validate().is_ok());
    }
}
