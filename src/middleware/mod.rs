//! HTTP middleware applied to every API route.

pub mod ip_guard;
pub mod security_headers;

pub use ip_guard::{RequestGuard, ip_guard_middleware};
pub use security_headers::security_headers_middleware;
