use crate::api;
use utoipa::OpenApi;

/// OpenAPI document served under `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    info(title = "OWLS Store API"),
    paths(
        api::health::health_check,
        api::auth::register,
        api::auth::login,
    ),
    tags(
        (name = "system", description = "Service status"),
        (name = "auth", description = "Accounts and sessions")
    )
)]
pub struct ApiDoc;
