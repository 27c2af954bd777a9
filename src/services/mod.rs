//! Services Layer
//!
//! Business logic extracted from HTTP handlers. Each service is a set of
//! stateless functions over the database connection or the application state.

pub mod location_service;
pub mod marketing_service;
pub mod notification_service;
pub mod oauth_service;
pub mod order_service;
pub mod review_service;
pub mod security_service;
pub mod shipping_service;
pub mod user_service;
