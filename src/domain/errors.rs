//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The HTTP mapping lives in `api::error`.

use std::fmt;

#[derive(Debug)]
pub enum DomainError {
    /// Resource not found
    NotFound(String),
    /// Malformed or missing input
    Validation(String),
    /// Input is well-formed but breaks a business rule
    BusinessRule(String),
    /// Credentials or token rejected
    Authentication { code: &'static str, message: String },
    /// Authenticated but not allowed
    PermissionDenied(String),
    /// Unique constraint clash
    Conflict(String),
    RateLimited { retry_after: u64 },
    /// Upstream HTTP service failed
    External { service: String, message: String },
    /// Social login failure, reported with a provider-flow code
    OAuth { code: &'static str, message: String },
    /// Database/persistence error
    Database(String),
    /// Generic internal error
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: &str) -> Self {
        DomainError::NotFound(format!("{} not found", what))
    }

    pub fn auth(code: &'static str, message: impl Into<String>) -> Self {
        DomainError::Authentication {
            code,
            message: message.into(),
        }
    }

    pub fn oauth(code: &'static str, message: impl Into<String>) -> Self {
        DomainError::OAuth {
            code,
            message: message.into(),
        }
    }

    pub fn external(service: &str, message: impl Into<String>) -> Self {
        DomainError::External {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Machine readable error code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::Validation(_) => "VALIDATION_ERROR",
            DomainError::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            DomainError::Authentication { code, .. } => code,
            DomainError::PermissionDenied(_) => "PERMISSION_DENIED",
            DomainError::Conflict(_) => "DUPLICATE_ENTRY",
            DomainError::RateLimited { .. } => "RATE_LIMITED",
            DomainError::External { .. } => "EXTERNAL_SERVICE_ERROR",
            DomainError::OAuth { code, .. } => code,
            DomainError::Database(_) | DomainError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            DomainError::OAuth {
                code: "not_found", ..
            } => 404,
            DomainError::Validation(_) | DomainError::OAuth { .. } => 400,
            DomainError::Authentication { .. } => 401,
            DomainError::PermissionDenied(_) => 403,
            DomainError::NotFound(_) => 404,
            DomainError::Conflict(_) => 409,
            DomainError::BusinessRule(_) => 422,
            DomainError::RateLimited { .. } => 429,
            DomainError::External { .. } => 502,
            DomainError::Database(_) | DomainError::Internal(_) => 500,
        }
    }

    /// Message safe to show to the client. Internal failures stay opaque.
    pub fn public_message(&self) -> String {
        match self {
            DomainError::NotFound(m)
            | DomainError::Validation(m)
            | DomainError::BusinessRule(m)
            | DomainError::PermissionDenied(m)
            | DomainError::Conflict(m) => m.clone(),
            DomainError::Authentication { message, .. } | DomainError::OAuth { message, .. } => {
                message.clone()
            }
            DomainError::RateLimited { .. } => "Too many requests".to_string(),
            DomainError::External { service, .. } => {
                format!("{} service is unavailable", service)
            }
            DomainError::Database(_) | DomainError::Internal(_) => {
                "An unexpected error occurred".to_string()
            }
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::Validation(msg) => write!(f, "Validation error: {}", msg),
            DomainError::BusinessRule(msg) => write!(f, "Business rule violation: {}", msg),
            DomainError::Authentication { code, message } => {
                write!(f, "Authentication failed ({}): {}", code, message)
            }
            DomainError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::RateLimited { retry_after } => {
                write!(f, "Rate limited, retry after {}s", retry_after)
            }
            DomainError::External { service, message } => {
                write!(f, "External service error ({}): {}", service, message)
            }
            DomainError::OAuth { code, message } => write!(f, "OAuth error ({}): {}", code, message),
            DomainError::Database(msg) => write!(f, "Database error: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<sea_orm::TransactionError<DomainError>> for DomainError {
    fn from(e: sea_orm::TransactionError<DomainError>) -> Self {
        match e {
            sea_orm::TransactionError::Connection(db) => db.into(),
            sea_orm::TransactionError::Transaction(inner) => inner,
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Internal(format!("serialization failed: {}", e))
    }
}

impl From<reqwest::Error> for DomainError {
    fn from(e: reqwest::Error) -> Self {
        DomainError::External {
            service: e
                .url()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| "upstream".to_string()),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_codes_and_statuses() {
        let e = DomainError::BusinessRule("Shipment already exists for this order".into());
        assert_eq!(e.http_status(), 422);
        assert_eq!(e.code(), "BUSINESS_RULE_VIOLATION");

        let e = DomainError::auth("INVALID_2FA_CODE", "Invalid verification code");
        assert_eq!(e.http_status(), 401);
        assert_eq!(e.code(), "INVALID_2FA_CODE");

        let e = DomainError::Database("disk I/O error".into());
        assert_eq!(e.http_status(), 500);
        assert_eq!(e.public_message(), "An unexpected error occurred");

        let e = DomainError::oauth("not_found", "No google connection");
        assert_eq!(e.http_status(), 404);
    }

    #[test]
    fn serialization_failures_surface_as_internal() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e = DomainError::from(bad);
        assert!(matches!(e, DomainError::Internal(_)));
        assert_eq!(e.http_status(), 500);
        assert_eq!(e.public_message(), "An unexpected error occurred");
    }
}
