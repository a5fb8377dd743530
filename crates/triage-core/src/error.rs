use thiserror::Error;

/// Failure of a single prediction request.
///
/// The three variants are kept distinct all the way to the response: a
/// client can fix [`InvalidInput`](Self::InvalidInput), an operator has to
/// fix [`ModelUnavailable`](Self::ModelUnavailable), and
/// [`Prediction`](Self::Prediction) means the input and the trained model
/// disagree about shape or type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("prediction failed: {0}")]
    Prediction(String),
}

impl PredictError {
    /// HTTP-equivalent status code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::ModelUnavailable(_) | Self::Prediction(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
