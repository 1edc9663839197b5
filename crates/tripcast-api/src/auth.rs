// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token guard for the `/v1` routes.
//!
//! Fails closed: with no `api.bearer_token` configured every request is
//! answered with 401.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

/// Token the `/v1` routes expect.
#[derive(Clone)]
pub struct AuthConfig {
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = if self.bearer_token.is_some() { "[redacted]" } else { "<unset>" };
        f.debug_struct("AuthConfig").field("bearer_token", &shown).finish()
    }
}

/// The token of an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

/// Compares without returning early on the first differing byte.
fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        tracing::error!("api.bearer_token is not configured, rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    match presented_token(request.headers()) {
        Some(token) if tokens_match(token, expected) => Ok(next.run(request).await),
        _ => {
            tracing::debug!(path = %request.uri().path(), "rejected unauthenticated request");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
