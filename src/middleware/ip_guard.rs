//! Per-IP request guard: blacklist, fixed-window rate limit and scanner detection.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Duration as ChronoDuration;
use dashmap::DashMap;
use serde_json::json;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::infrastructure::AppState;
use crate::models::security_audit_log as audit;
use crate::services::security_service;
use crate::utils::net::{ClientInfo, client_ip, user_agent};

const WINDOW: Duration = Duration::from_secs(60);
const SUSPICIOUS_AGENTS: &[&str] = &["sqlmap", "nikto", "nmap", "masscan", "dirbuster"];
const SUSPICION_STEP: u32 = 10;
const SUSPICION_THRESHOLD: u32 = 50;
const SUSPICION_TTL: Duration = Duration::from_secs(3600);
const PRUNE_ABOVE: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

struct Suspicion {
    last_seen: Instant,
    score: u32,
}

pub struct RequestGuard {
    limit_per_minute: u32,
    prune_above: usize,
    windows: DashMap<String, Window>,
    scores: DashMap<String, Suspicion>,
}

impl RequestGuard {
    /// A limit of 0 disables rate limiting.
    pub fn new(limit_per_minute: u32) -> Self {
        Self {
            limit_per_minute,
            prune_above: PRUNE_ABOVE,
            windows: DashMap::new(),
            scores: DashMap::new(),
        }
    }

    /// Count a request; false once the IP is over budget for the current window.
    pub fn hit(&self, ip: &str) -> bool {
        if self.limit_per_minute == 0 {
            return true;
        }

        if self.windows.len() > self.prune_above {
            self.windows.retain(|_, w| w.started.elapsed() < WINDOW);
        }

        let mut window = self.windows.entry(ip.to_string()).or_insert(Window {
            started: Instant::now(),
            count: 0,
        });
        if window.started.elapsed() >= WINDOW {
            window.started = Instant::now();
            window.count = 0;
        }
        window.count += 1;
        window.count <= self.limit_per_minute
    }

    /// Add to the IP's suspicion score and return the new value.
    /// Scores left alone for an hour start over.
    pub fn bump_suspicion(&self, ip: &str, amount: u32) -> u32 {
        if self.scores.len() > self.prune_above {
            self.scores.retain(|_, s| s.last_seen.elapsed() < SUSPICION_TTL);
        }

        let mut entry = self.scores.entry(ip.to_string()).or_insert(Suspicion {
            last_seen: Instant::now(),
            score: 0,
        });
        if entry.last_seen.elapsed() >= SUSPICION_TTL {
            entry.score = 0;
        }
        entry.last_seen = Instant::now();
        entry.score += amount;
        entry.score
    }

    pub fn reset_suspicion(&self, ip: &str) {
        self.scores.remove(ip);
    }
}

pub fn is_suspicious_agent(agent: &str) -> bool {
    let lowered = agent.to_lowercase();
    SUSPICIOUS_AGENTS.iter().any(|needle| lowered.contains(needle))
}

fn denied() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Access denied", "code": "IP_BLOCKED" })),
    )
        .into_response()
}

pub async fn ip_guard_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let client = ClientInfo {
        ip: client_ip(request.headers(), remote),
        user_agent: user_agent(request.headers()),
    };

    if is_suspicious_agent(&client.user_agent) {
        let score = state.guard.bump_suspicion(&client.ip, SUSPICION_STEP);
        tracing::warn!(
            "Suspicious user agent from {} (score {}): {}",
            client.ip,
            score,
            client.user_agent
        );

        if score >= SUSPICION_THRESHOLD {
            state.guard.reset_suspicion(&client.ip);
            if let Err(e) = security_service::block_ip(
                state.db(),
                &client.ip,
                "abuse",
                "Automated scanner detected",
                Some(ChronoDuration::hours(1)),
            )
            .await
            {
                tracing::error!("Failed to block {}: {}", client.ip, e);
            }
            security_service::audit(
                state.db(),
                None,
                audit::IP_BLOCKED,
                audit::SEVERITY_CRITICAL,
                &client,
                json!({ "reason": "suspicious_user_agent", "score": score }),
            )
            .await;
            return denied();
        }
    }

    match security_service::is_ip_blocked(state.db(), &client.ip).await {
        Ok(true) => {
            tracing::warn!("Rejected request from blocked IP {}", client.ip);
            return denied();
        }
        Ok(false) => {}
        Err(e) => tracing::error!("IP blacklist lookup failed: {}", e),
    }

    if !state.guard.hit(&client.ip) {
        tracing::warn!("Rate limit exceeded for {}", client.ip);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", "60")],
            Json(json!({ "error": "Too many requests", "code": "RATE_LIMITED" })),
        )
            .into_response();
    }

    next.run(request).await
}
