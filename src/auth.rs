//! Shared-secret gate for the host role
//!
//! With `WHEELDASH_HOST_TOKEN` set, the host socket must present `?token=` and the HTTP
//! API an `Authorization: Bearer` header. Without it the host role is open to anyone
//! on the network.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Clone, Default)]
pub struct HostAuth {
    token: Option<String>,
}

impl HostAuth {
    pub fn from_env() -> Self {
        let token = std::env::var("WHEELDASH_HOST_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if token.is_some() {
            tracing::info!("Host token required for host connections");
        } else {
            tracing::warn!("WHEELDASH_HOST_TOKEN not set: anyone can connect as host");
        }
        Self { token }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Open gate when no token is configured
    pub fn validate(&self, presented: Option<&str>) -> bool {
        match (&self.token, presented) {
            (None, _) => true,
            (Some(expected), Some(given)) => constant_time_eq(expected.as_bytes(), given.as_bytes()),
            (Some(_), None) => false,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Middleware for the host HTTP API
pub async fn host_api_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.host_auth.validate(bearer_token(request.headers())) {
        return next.run(request).await;
    }
    tracing::warn!("Rejected API call to {} without host token", request.uri().path());
    (StatusCode::UNAUTHORIZED, "Host token required").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_disabled_gate_lets_everyone_in() {
        let auth = HostAuth::default();
        assert!(!auth.is_enabled());
        assert!(auth.validate(None));
        assert!(auth.validate(Some("anything")));
    }

    #[test]
    fn test_token_must_match() {
        let auth = HostAuth::with_token("chalk-42");
        assert!(auth.validate(Some("chalk-42")));
        assert!(!auth.validate(Some("chalk-43")));
        assert!(!auth.validate(Some("chalk")));
        assert!(!auth.validate(None));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer chalk-42"));
        assert_eq!(bearer_token(&headers), Some("chalk-42"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
