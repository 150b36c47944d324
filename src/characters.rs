use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use player_db::{CharacterRecord, PlayerDb, PlayerDbError};
use world::character::{Character, CharacterError, CharacterStore};
use world::EventPublisher;

const DEFAULT_CLASS: &str = "adventurer";

/// Character persistence over the SQLite store. Database calls run on the
/// blocking pool so the session tasks never stall on disk I/O.
pub struct CharacterService {
    db: Arc<PlayerDb>,
    publisher: Arc<dyn EventPublisher>,
    zone_id: String,
}

impl CharacterService {
    pub fn new(db: Arc<PlayerDb>, publisher: Arc<dyn EventPublisher>, zone_id: String) -> Self {
        Self {
            db,
            publisher,
            zone_id,
        }
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T, CharacterError>
    where
        T: Send + 'static,
        F: FnOnce(&PlayerDb) -> Result<T, PlayerDbError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| CharacterError::Backend(e.to_string()))?
            .map_err(|e| CharacterError::Backend(e.to_string()))
    }
}

fn into_character(record: CharacterRecord) -> Character {
    Character {
        id: record.id,
        account_id: record.account_id,
        name: record.name,
        class: record.class,
        zone_id: record.zone_id,
        pos_x: record.pos_x,
        pos_y: record.pos_y,
        created_at: record.created_at,
    }
}

#[async_trait]
impl CharacterStore for CharacterService {
    async fn create(
        &self,
        account_id: Uuid,
        name: &str,
        class: &str,
    ) -> Result<Character, CharacterError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(CharacterError::InvalidName);
        }
        let class = if class.trim().is_empty() {
            DEFAULT_CLASS.to_string()
        } else {
            class.trim().to_string()
        };
        let zone_id = self.zone_id.clone();
        let record = self
            .run_blocking(move |db| db.character().create(account_id, &name, &class, &zone_id))
            .await?;

        let payload = serde_json::json!({
            "character_id": record.id,
            "user_id": record.account_id,
        });
        match serde_json::to_vec(&payload) {
            Ok(bytes) => self.publisher.publish("character.created", &bytes),
            Err(err) => tracing::debug!(error = %err, "event payload serialization failed"),
        }

        Ok(into_character(record))
    }

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<Character>, CharacterError> {
        let records = self
            .run_blocking(move |db| db.character().list_for_account(account_id))
            .await?;
        Ok(records.into_iter().map(into_character).collect())
    }

    async fn get_for_account(
        &self,
        account_id: Uuid,
        character_id: Uuid,
    ) -> Result<Character, CharacterError> {
        let record = self
            .run_blocking(move |db| db.character().get(character_id))
            .await?
            .ok_or(CharacterError::NotFound)?;
        if record.account_id != account_id {
            return Err(CharacterError::Forbidden);
        }
        Ok(into_character(record))
    }

    async fn update_position(
        &self,
        account_id: Uuid,
        character_id: Uuid,
        x: f64,
        y: f64,
        zone_id: &str,
    ) -> Result<(), CharacterError> {
        let zone_id = zone_id.to_string();
        let updated = self
            .run_blocking(move |db| {
                db.character()
                    .update_position(account_id, character_id, x, y, &zone_id)
            })
            .await?;
        if updated {
            Ok(())
        } else {
            Err(CharacterError::Forbidden)
        }
    }
}
