//! HTTP mapping for domain errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::domain::DomainError;

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match &self {
            DomainError::Database(_) | DomainError::Internal(_) => {
                tracing::error!("Unhandled error: {}", self);
            }
            DomainError::External { .. } => tracing::warn!("{}", self),
            _ => {}
        }

        let details: Option<Value> = match &self {
            DomainError::RateLimited { retry_after } => Some(json!({ "retry_after": retry_after })),
            DomainError::External { service, .. } => Some(json!({ "service": service })),
            _ => None,
        };

        let mut body = json!({
            "code": self.code(),
            "message": self.public_message(),
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, DomainError>;
