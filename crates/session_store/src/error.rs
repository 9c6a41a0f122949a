//! Session store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage task join error: {0}")]
    Task(String),

    #[error("session not found: {0}")]
    NotFound(i64),

    #[error("session name must not be empty")]
    InvalidName,
}

pub type Result<T> = std::result::Result<T, StoreError>;
