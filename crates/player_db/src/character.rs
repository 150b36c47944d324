use std::sync::MutexGuard;

use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::account::parse_uuid;
use crate::error::PlayerDbError;

/// A character row. Position `(0, 0)` is the never-placed default; the
/// world treats it as "use the spawn point".
#[derive(Debug, Clone)]
pub struct CharacterRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub class: String,
    pub zone_id: String,
    pub pos_x: f64,
    pub pos_y: f64,
    pub created_at: String,
}

/// Repository for character operations.
pub struct CharacterRepo<'a> {
    conn: MutexGuard<'a, Connection>,
}

const CHARACTER_COLUMNS: &str = "id, account_id, name, class, zone_id, pos_x, pos_y, created_at";

impl<'a> CharacterRepo<'a> {
    pub(crate) fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    pub fn create(
        &self,
        account_id: Uuid,
        name: &str,
        class: &str,
        zone_id: &str,
    ) -> Result<CharacterRecord, PlayerDbError> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO characters (id, account_id, name, class, zone_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                id.to_string(),
                account_id.to_string(),
                name,
                class,
                zone_id
            ],
        )?;
        self.get(id)?.ok_or(PlayerDbError::CharacterNotFound(id))
    }

    pub fn get(&self, character_id: Uuid) -> Result<Option<CharacterRecord>, PlayerDbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {CHARACTER_COLUMNS} FROM characters WHERE id = ?1"),
                [character_id.to_string()],
                raw_record,
            )
            .optional()?;
        row.map(into_record).transpose()
    }

    pub fn list_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<CharacterRecord>, PlayerDbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CHARACTER_COLUMNS} FROM characters
             WHERE account_id = ?1 ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map([account_id.to_string()], raw_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(into_record(row?)?);
        }
        Ok(records)
    }

    /// Persist a position, scoped to the owning account. Returns false when
    /// no row matched (wrong owner or unknown character).
    pub fn update_position(
        &self,
        account_id: Uuid,
        character_id: Uuid,
        x: f64,
        y: f64,
        zone_id: &str,
    ) -> Result<bool, PlayerDbError> {
        let affected = self.conn.execute(
            "UPDATE characters SET pos_x = ?1, pos_y = ?2, zone_id = ?3
             WHERE id = ?4 AND account_id = ?5",
            rusqlite::params![
                x,
                y,
                zone_id,
                character_id.to_string(),
                account_id.to_string()
            ],
        )?;
        Ok(affected > 0)
    }
}

type RawRecord = (String, String, String, String, String, f64, f64, String);

fn raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn into_record(raw: RawRecord) -> Result<CharacterRecord, PlayerDbError> {
    let (id, account_id, name, class, zone_id, pos_x, pos_y, created_at) = raw;
    Ok(CharacterRecord {
        id: parse_uuid(&id)?,
        account_id: parse_uuid(&account_id)?,
        name,
        class,
        zone_id,
        pos_x,
        pos_y,
        created_at,
    })
}
