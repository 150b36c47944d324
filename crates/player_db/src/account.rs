use std::sync::MutexGuard;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::PlayerDbError;

/// An account record. The password hash never leaves this module.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub created_at: String,
}

/// Repository for account operations.
pub struct AccountRepo<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> AccountRepo<'a> {
    pub(crate) fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    /// Create a new account. The email is matched case-insensitively
    /// against existing rows.
    pub fn create(&self, email: &str, password: &str) -> Result<Account, PlayerDbError> {
        if self.get_by_email(email)?.is_some() {
            return Err(PlayerDbError::EmailTaken(email.to_string()));
        }

        let password_hash = hash_password(password)?;
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO accounts (id, email, password_hash) VALUES (?1, ?2, ?3)",
            rusqlite::params![id.to_string(), email, password_hash],
        )?;

        self.get_by_email(email)?
            .ok_or_else(|| PlayerDbError::AccountNotFound(email.to_string()))
    }

    /// Verify credentials, returning the account on success.
    pub fn verify(&self, email: &str, password: &str) -> Result<Account, PlayerDbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, email, password_hash, created_at FROM accounts WHERE email = ?1",
                [email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, email, stored_hash, created_at)) = row else {
            return Err(PlayerDbError::AccountNotFound(email.to_string()));
        };

        let parsed =
            PasswordHash::new(&stored_hash).map_err(|e| PlayerDbError::Hash(e.to_string()))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Err(PlayerDbError::InvalidPassword);
        }

        Ok(Account {
            id: parse_uuid(&id)?,
            email,
            created_at,
        })
    }

    pub fn get_by_email(&self, email: &str) -> Result<Option<Account>, PlayerDbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, email, created_at FROM accounts WHERE email = ?1",
                [email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, email, created_at)| {
            Ok(Account {
                id: parse_uuid(&id)?,
                email,
                created_at,
            })
        })
        .transpose()
    }
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, PlayerDbError> {
    Uuid::parse_str(raw).map_err(|_| PlayerDbError::Corrupt(format!("bad uuid: {raw}")))
}

fn hash_password(password: &str) -> Result<String, PlayerDbError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PlayerDbError::Hash(e.to_string()))
}
