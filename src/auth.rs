use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use net::{AuthBackend, AuthError, AuthResult};
use player_db::{Account, PlayerDb, PlayerDbError};

use crate::config::AuthSection;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    iat: u64,
    exp: u64,
}

/// HS256 token issuance over the account store. Password hashing itself
/// lives in `player_db`.
pub struct AuthService {
    db: Arc<PlayerDb>,
    secret: String,
    token_ttl_secs: u64,
}

impl AuthService {
    pub fn new(db: Arc<PlayerDb>, config: &AuthSection) -> Self {
        Self {
            db,
            secret: config.jwt_secret.clone(),
            token_ttl_secs: config.token_ttl_secs,
        }
    }

    fn issue_token(&self, account: &Account) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Backend(e.to_string()))?
            .as_secs();
        let claims = Claims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            iat: now,
            exp: now + self.token_ttl_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Backend(e.to_string()))
    }

    fn auth_result(&self, account: Account) -> Result<AuthResult, AuthError> {
        let token = self.issue_token(&account)?;
        Ok(AuthResult {
            user_id: account.id,
            token,
        })
    }
}

#[async_trait]
impl AuthBackend for AuthService {
    async fn register(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidCredentials);
        }
        let db = self.db.clone();
        let password = password.to_string();
        let account = {
            let email = email.clone();
            tokio::task::spawn_blocking(move || db.account().create(&email, &password))
                .await
                .map_err(|e| AuthError::Backend(e.to_string()))?
        };
        match account {
            Ok(account) => self.auth_result(account),
            Err(PlayerDbError::EmailTaken(_)) => Err(AuthError::EmailInUse),
            Err(err) => Err(AuthError::Backend(err.to_string())),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        let email = email.trim().to_lowercase();
        let db = self.db.clone();
        let password = password.to_string();
        let account = {
            let email = email.clone();
            tokio::task::spawn_blocking(move || db.account().verify(&email, &password))
                .await
                .map_err(|e| AuthError::Backend(e.to_string()))?
        };
        match account {
            Ok(account) => self.auth_result(account),
            Err(PlayerDbError::AccountNotFound(_)) | Err(PlayerDbError::InvalidPassword) => {
                Err(AuthError::InvalidCredentials)
            }
            Err(err) => Err(AuthError::Backend(err.to_string())),
        }
    }

    fn parse_token(&self, token: &str) -> Result<Uuid, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AuthError::InvalidCredentials)?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(PlayerDb::open_memory().unwrap()),
            &AuthSection {
                jwt_secret: "test-secret".to_string(),
                token_ttl_secs: 3600,
            },
        )
    }

    #[tokio::test]
    async fn register_issues_parsable_token() {
        let auth = service();
        let result = auth
            .register("Aria@Example.com", "password123")
            .await
            .unwrap();
        let parsed = auth.parse_token(&result.token).unwrap();
        assert_eq!(parsed, result.user_id);
    }

    #[tokio::test]
    async fn register_normalizes_email() {
        let auth = service();
        auth.register("Aria@Example.com", "password123").await.unwrap();
        // Same address with different casing hits the uniqueness check.
        let err = auth.register("aria@example.com", "password123").await;
        assert!(matches!(err, Err(AuthError::EmailInUse)));
        // But login works with the normalized form.
        auth.login("ARIA@EXAMPLE.COM", "password123").await.unwrap();
    }

    #[tokio::test]
    async fn short_password_rejected() {
        let auth = service();
        let err = auth.register("aria@example.com", "short").await;
        assert!(matches!(err, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn login_with_wrong_password_rejected() {
        let auth = service();
        auth.register("aria@example.com", "password123").await.unwrap();
        let err = auth.login("aria@example.com", "password321").await;
        assert!(matches!(err, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn garbage_token_rejected() {
        let auth = service();
        assert!(auth.parse_token("not.a.token").is_err());
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_rejected() {
        let auth = service();
        let result = auth.register("aria@example.com", "password123").await.unwrap();

        let other = AuthService::new(
            Arc::new(PlayerDb::open_memory().unwrap()),
            &AuthSection {
                jwt_secret: "different-secret".to_string(),
                token_ttl_secs: 3600,
            },
        );
        assert!(other.parse_token(&result.token).is_err());
    }
}
