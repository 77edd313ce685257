use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use cinesim_core::RecommendError;
use serde_json::json;

/// HTTP face of [`RecommendError`].
#[derive(Debug)]
pub struct ApiError(pub RecommendError);

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self { ApiError(err) }
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError(RecommendError::InvalidInput(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RecommendError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            RecommendError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RecommendError::NotFound(_) => StatusCode::NOT_FOUND,
            RecommendError::DataLoad(_) | RecommendError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            RecommendError::DataLoad(_) | RecommendError::Internal(_) => {
                tracing::error!(error = %self.0, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        if self.0.is_retryable() {
            return (status, [(header::RETRY_AFTER, "5")], body).into_response();
        }
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
