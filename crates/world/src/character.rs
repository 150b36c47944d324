use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// A persisted character owned by an account. `pos_x`/`pos_y` of `(0, 0)`
/// means the character has never been placed; the join handler then uses
/// the map spawn point instead.
#[derive(Debug, Clone, Serialize)]
pub struct Character {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub class: String,
    pub zone_id: String,
    pub pos_x: f64,
    pub pos_y: f64,
    pub created_at: String,
}

#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("character not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("character name is required")]
    InvalidName,

    #[error("character backend error: {0}")]
    Backend(String),
}

/// Character persistence consumed by the world core. Implementations must
/// respect cancellation: callers wrap lookups and position writes in
/// deadlines and drop the future on timeout.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn create(
        &self,
        account_id: Uuid,
        name: &str,
        class: &str,
    ) -> Result<Character, CharacterError>;

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<Character>, CharacterError>;

    /// Resolve a character and verify it belongs to `account_id`.
    async fn get_for_account(
        &self,
        account_id: Uuid,
        character_id: Uuid,
    ) -> Result<Character, CharacterError>;

    /// Best-effort position write, scoped to the owning account.
    async fn update_position(
        &self,
        account_id: Uuid,
        character_id: Uuid,
        x: f64,
        y: f64,
        zone_id: &str,
    ) -> Result<(), CharacterError>;
}
