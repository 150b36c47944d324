use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already in use")]
    EmailInUse,

    #[error("auth backend error: {0}")]
    Backend(String),
}

/// Issued to a client on register/login; the token authenticates the
/// WebSocket upgrade and the character routes.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub user_id: Uuid,
    pub token: String,
}

/// Account authentication consumed by the HTTP layer. The core only ever
/// sees the verified account id a token resolves to.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn register(&self, email: &str, password: &str) -> Result<AuthResult, AuthError>;

    async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AuthError>;

    fn parse_token(&self, token: &str) -> Result<Uuid, AuthError>;
}

/// Pull a token out of the Authorization header. A `Bearer ` prefix is
/// stripped when present; a bare token is accepted as-is.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
