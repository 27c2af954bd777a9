//! OAuth 2.0 provider HTTP client
//!
//! Authorization-code exchange and userinfo lookup for the providers that
//! support a full login flow (google, github, facebook).

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
}

impl ProviderEndpoints {
    fn new(authorize: &str, token: &str, userinfo: &str, scopes: &[&str]) -> Self {
        Self {
            authorize_url: authorize.to_string(),
            token_url: token.to_string(),
            userinfo_url: userinfo.to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}

pub fn default_endpoints() -> HashMap<String, ProviderEndpoints> {
    let mut map = HashMap::new();
    map.insert(
        "google".to_string(),
        ProviderEndpoints::new(
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
            "https://www.googleapis.com/oauth2/v2/userinfo",
            &["openid", "email", "profile"],
        ),
    );
    map.insert(
        "github".to_string(),
        ProviderEndpoints::new(
            "https://github.com/login/oauth/authorize",
            "https://github.com/login/oauth/access_token",
            "https://api.github.com/user",
            &["user:email"],
        ),
    );
    map.insert(
        "facebook".to_string(),
        ProviderEndpoints::new(
            "https://www.facebook.com/v18.0/dialog/oauth",
            "https://graph.facebook.com/v18.0/oauth/access_token",
            "https://graph.facebook.com/me?fields=id,name,email,picture",
            &["email", "public_profile"],
        ),
    );
    map
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Provider profile reduced to the fields the store keeps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocialProfile {
    pub provider_user_id: String,
    pub email: Option<String>,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub raw: Value,
}

pub async fn exchange_code(
    http: &reqwest::Client,
    endpoints: &ProviderEndpoints,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse, DomainError> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("grant_type", "authorization_code"),
    ];

    let response = http
        .post(&endpoints.token_url)
        .header("Accept", "application/json")
        .form(&params)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!("OAuth token request failed: {}", e);
            DomainError::oauth("token_error", "Token exchange failed")
        })?;

    if !response.status().is_success() {
        tracing::warn!("OAuth token endpoint returned {}", response.status());
        return Err(DomainError::oauth("token_error", "Token exchange failed"));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|_| DomainError::oauth("token_error", "Token exchange failed"))
}

pub async fn fetch_userinfo(
    http: &reqwest::Client,
    endpoints: &ProviderEndpoints,
    access_token: &str,
) -> Result<Value, DomainError> {
    let response = http
        .get(&endpoints.userinfo_url)
        .bearer_auth(access_token)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|_| DomainError::oauth("userinfo_error", "Failed to get user info"))?;

    if !response.status().is_success() {
        tracing::warn!("OAuth userinfo endpoint returned {}", response.status());
        return Err(DomainError::oauth("userinfo_error", "Failed to get user info"));
    }

    response
        .json::<Value>()
        .await
        .map_err(|_| DomainError::oauth("userinfo_error", "Failed to get user info"))
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn id_field(data: &Value) -> String {
    match data.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn split_name(name: &str) -> (String, String) {
    match name.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

pub fn normalize_profile(provider: &str, data: Value) -> SocialProfile {
    let id = id_field(&data);
    let email = str_field(&data, "email").map(|e| e.to_lowercase());

    match provider {
        "google" => {
            let name = str_field(&data, "name").unwrap_or_default();
            SocialProfile {
                provider_user_id: id,
                email,
                first_name: str_field(&data, "given_name").unwrap_or_default(),
                last_name: str_field(&data, "family_name").unwrap_or_default(),
                name,
                username: None,
                avatar_url: str_field(&data, "picture"),
                email_verified: data
                    .get("verified_email")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
                raw: data,
            }
        }
        "github" => {
            let login = str_field(&data, "login");
            let name = str_field(&data, "name")
                .or_else(|| login.clone())
                .unwrap_or_default();
            let (first_name, last_name) = split_name(&name);
            SocialProfile {
                provider_user_id: id,
                email,
                name,
                first_name,
                last_name,
                username: login,
                avatar_url: str_field(&data, "avatar_url"),
                email_verified: true,
                raw: data,
            }
        }
        "facebook" => {
            let name = str_field(&data, "name").unwrap_or_default();
            let (first_name, last_name) = split_name(&name);
            let avatar_url = data
                .pointer("/picture/data/url")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            SocialProfile {
                provider_user_id: id,
                email,
                name,
                first_name,
                last_name,
                username: None,
                avatar_url,
                email_verified: false,
                raw: data,
            }
        }
        _ => {
            let name = str_field(&data, "name").unwrap_or_default();
            let (first_name, last_name) = split_name(&name);
            SocialProfile {
                provider_user_id: id,
                email,
                name,
                first_name,
                last_name,
                username: None,
                avatar_url: None,
                email_verified: false,
                raw: data,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn github_numeric_id_and_login_fallback() {
        let profile = normalize_profile(
            "github",
            json!({"id": 4242, "login": "owlfan", "name": null, "avatar_url": "https://a/x.png"}),
        );
        assert_eq!(profile.provider_user_id, "4242");
        assert_eq!(profile.name, "owlfan");
        assert_eq!(profile.username.as_deref(), Some("owlfan"));
        assert!(profile.email_verified);
    }

    #[test]
    fn facebook_picture_is_nested() {
        let profile = normalize_profile(
            "facebook",
            json!({"id": "10", "name": "Lan Nguyen", "picture": {"data": {"url": "https://fb/p.jpg"}}}),
        );
        assert_eq!(profile.avatar_url.as_deref(), Some("https://fb/p.jpg"));
        assert_eq!(profile.first_name, "Lan");
        assert_eq!(profile.last_name, "Nguyen");
    }

    #[test]
    fn google_keeps_verified_flag() {
        let profile = normalize_profile(
            "google",
            json!({"id": "g1", "email": "Lan@Example.com", "verified_email": true,
                   "given_name": "Lan", "family_name": "Tran", "name": "Lan Tran"}),
        );
        assert_eq!(profile.email.as_deref(), Some("lan@example.com"));
        assert!(profile.email_verified);
        assert_eq!(profile.last_name, "Tran");
    }

    #[test]
    fn default_scopes_join_with_spaces() {
        let endpoints = default_endpoints();
        assert_eq!(endpoints["google"].scope(), "openid email profile");
        assert_eq!(endpoints["github"].scope(), "user:email");
    }
}
