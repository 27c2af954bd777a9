use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::error::ApiResult;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{AuthUser, MaybeUser};
use crate::models::social_connection;
use crate::services::oauth_service;
use crate::utils::net::ClientInfo;

const ACTIONS: &[&str] = &["login", "register", "link"];

pub async fn providers(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(oauth_service::providers(&state).await?))
}

#[derive(Deserialize)]
pub struct AuthorizeQuery {
    pub next: Option<String>,
    pub action: Option<String>,
}

pub async fn authorize(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(provider): Path<String>,
    Query(query): Query<AuthorizeQuery>,
) -> ApiResult<Json<Value>> {
    let action = query.action.as_deref().unwrap_or("login");
    if !ACTIONS.contains(&action) {
        return Err(DomainError::Validation(format!("Invalid action: {}", action)));
    }
    let body = oauth_service::authorize(
        &state,
        &provider,
        action,
        user.as_ref().map(|u| u.id()),
        query.next.as_deref(),
    )
    .await?;
    Ok(Json(body))
}

#[derive(Deserialize)]
pub struct CallbackRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

pub async fn callback(
    State(state): State<AppState>,
    client: ClientInfo,
    Path(provider): Path<String>,
    Json(payload): Json<CallbackRequest>,
) -> ApiResult<Json<Value>> {
    if payload.code.is_empty() || payload.state.is_empty() {
        return Err(DomainError::oauth(
            "invalid_request",
            "code and state are required",
        ));
    }
    let body =
        oauth_service::callback(&state, &provider, &payload.code, &payload.state, &client).await?;
    Ok(Json(body))
}

pub async fn connections(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<social_connection::Model>>> {
    Ok(Json(
        oauth_service::connections(state.db(), auth.id()).await?,
    ))
}

#[derive(Deserialize)]
pub struct ConnectQuery {
    pub next: Option<String>,
}

pub async fn connect(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(provider): Path<String>,
    Query(query): Query<ConnectQuery>,
) -> ApiResult<Json<Value>> {
    let body = oauth_service::authorize(
        &state,
        &provider,
        "link",
        Some(auth.id()),
        query.next.as_deref(),
    )
    .await?;
    Ok(Json(body))
}

pub async fn disconnect(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(provider): Path<String>,
) -> ApiResult<Json<Value>> {
    oauth_service::disconnect(state.db(), &auth.user, &provider).await?;
    Ok(Json(json!({ "message": "Disconnected successfully" })))
}
