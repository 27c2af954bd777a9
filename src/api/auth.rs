use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::error::ApiResult;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{AuthUser, TokenPair};
use crate::models::user::{self, UserDto};
use crate::services::user_service::{self, LoginOutcome, Registration, SecondFactor};
use crate::utils::net::ClientInfo;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_token: Option<String>,
}

#[derive(Deserialize)]
pub struct SecondFactorRequest {
    pub user_id: String,
    pub code: String,
    #[serde(default)]
    pub is_backup: bool,
    #[serde(default)]
    pub trust_device: bool,
    pub device_name: Option<String>,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    pub new_password: String,
}

fn session_body(user: &user::Model, tokens: TokenPair) -> Value {
    json!({
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "user": UserDto::from(user),
    })
}

fn outcome_body(outcome: LoginOutcome) -> Value {
    match outcome {
        LoginOutcome::Authenticated { user, tokens } => session_body(&user, tokens),
        LoginOutcome::TwoFactorRequired { user_id, method } => json!({
            "requires_2fa": true,
            "user_id": user_id,
            "method": method,
        }),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    responses(
        (status = 201, description = "Account created"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (user, tokens) = user_service::register(
        &state,
        Registration {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(session_body(&user, tokens))))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    responses(
        (status = 200, description = "Tokens, or a 2FA challenge"),
        (status = 401, description = "Invalid credentials or locked account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let outcome = user_service::login(
        &state,
        &payload.email,
        &payload.password,
        payload.device_token.as_deref(),
        &client,
    )
    .await?;
    Ok(Json(outcome_body(outcome)))
}

pub async fn login_2fa(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(payload): Json<SecondFactorRequest>,
) -> ApiResult<Json<Value>> {
    let (outcome, device_token) = user_service::login_second_factor(
        &state,
        SecondFactor {
            user_id: payload.user_id,
            code: payload.code,
            is_backup: payload.is_backup,
            trust_device: payload.trust_device,
            device_name: payload.device_name,
        },
        &client,
    )
    .await?;

    let mut body = outcome_body(outcome);
    if let Some(token) = device_token {
        body["device_token"] = json!(token);
    }
    Ok(Json(body))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    Ok(Json(user_service::refresh(&state, &payload.refresh).await?))
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
) -> ApiResult<Json<Value>> {
    user_service::logout(&state, &auth.user, &client).await;
    Ok(Json(json!({ "message": "Logged out" })))
}

pub async fn me(auth: AuthUser) -> Json<UserDto> {
    Json(UserDto::from(&auth.user))
}

pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ProfileUpdate>,
) -> ApiResult<Json<UserDto>> {
    let user = state
        .user_repo
        .update_profile(auth.id(), payload.first_name, payload.last_name)
        .await?;
    Ok(Json(UserDto::from(&user)))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    user_service::change_password(
        &state,
        &auth.user,
        &payload.old_password,
        &payload.new_password,
        &client,
    )
    .await?;
    Ok(Json(json!({ "message": "Password changed" })))
}
