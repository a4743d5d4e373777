use crate::domain::error::PipelineError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype over the domain error so the HTTP mapping lives in the adapter layer.
#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

// The processor only ever learns "bad signature" or "bad JSON". Details stay in the logs.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            PipelineError::WebhookSignature(_) => (StatusCode::BAD_REQUEST, "Invalid signature"),
            PipelineError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "Invalid JSON"),
            PipelineError::Validation(msg) => {
                tracing::error!("unhandled validation error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
            PipelineError::Database(err) => {
                tracing::error!("database error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
