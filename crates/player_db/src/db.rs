use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;

use crate::account::AccountRepo;
use crate::character::CharacterRepo;
use crate::error::PlayerDbError;
use crate::schema;

/// Database handle wrapping a single SQLite connection. The connection sits
/// behind a mutex so the handle can be shared across blocking worker
/// threads; individual calls are short.
pub struct PlayerDb {
    conn: Mutex<Connection>,
}

impl PlayerDb {
    /// Open (or create) a database at the given file path.
    pub fn open(path: &str) -> Result<Self, PlayerDbError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        schema::create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self, PlayerDbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn account(&self) -> AccountRepo<'_> {
        AccountRepo::new(self.lock())
    }

    pub fn character(&self) -> CharacterRepo<'_> {
        CharacterRepo::new(self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
