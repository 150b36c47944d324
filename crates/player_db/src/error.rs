use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PlayerDbError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("email already in use: {0}")]
    EmailTaken(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("invalid password")]
    InvalidPassword,

    #[error("character not found: {0}")]
    CharacterNotFound(Uuid),

    #[error("password hashing error: {0}")]
    Hash(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}
