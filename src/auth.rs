//! Bearer-token gate.
//!
//! Every route is wrapped by [`require_bearer`]. A request must carry
//! `Authorization: Bearer <token>`:
//!
//! - header missing, not ASCII, or without the `Bearer ` prefix → 401
//! - token present but different from the configured secret → 403
//!
//! The token is the text between `Bearer ` and the next space, so
//! `Bearer abc extra` carries `abc` and `Bearer  abc` carries an empty token.
//!
//! The secret is handed to [`AuthGate::new`] at startup. When no secret is
//! configured every token is rejected with 403.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Holds the expected bearer token for the lifetime of the process.
#[derive(Clone)]
pub struct AuthGate {
    secret: Option<Arc<str>>,
}

impl AuthGate {
    pub fn new(secret: Option<String>) -> Self {
        if secret.is_none() {
            tracing::warn!("no API token configured; every request will be rejected");
        }
        Self {
            secret: secret.map(Arc::from),
        }
    }

    /// Check the `Authorization` header of a request.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let token = bearer_token(headers).ok_or_else(|| {
            AppError::unauthenticated(
                "missing or malformed Authorization header; expected `Bearer <token>`",
            )
        })?;
        match &self.secret {
            Some(secret) if token == secret.as_ref() => Ok(()),
            _ => Err(AppError::forbidden("token not authorized")),
        }
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|rest| rest.split_once(' ').map_or(rest, |(token, _)| token))
}

/// Axum middleware applying [`AuthGate::check`] before the handler runs.
pub async fn require_bearer(State(gate): State<AuthGate>, request: Request, next: Next) -> Response {
    match gate.check(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            tracing::debug!(
                path = %request.uri().path(),
                code = %err.code,
                "request rejected by auth gate"
            );
            err.into_response()
        }
    }
}
