//! HTTP error mapping for API handlers.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shortpaste_core::AppError;

/// Wrapper that renders an [`AppError`] as `{ "message": ... }`.
#[derive(Debug)]
pub struct HttpError(pub AppError);

impl From<AppError> for HttpError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl HttpError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::KeyConflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::StorageTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_)
            | AppError::KeySpaceExhausted { .. }
            | AppError::Config(_)
            | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            AppError::Storage(err) => {
                tracing::error!("Storage error: {}", err);
                "Error adding document.".to_string()
            }
            AppError::KeySpaceExhausted { attempts } => {
                tracing::error!("No free key after {} attempts", attempts);
                "Could not allocate a key for this document.".to_string()
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error at runtime: {}", msg);
                "Internal server error".to_string()
            }
            AppError::NotFound => "Document not found.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "message": self.message() }));
        let mut response = (status, body).into_response();
        if let AppError::RateLimitExceeded { retry_after } = &self.0 {
            let seconds = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
