//! Session storage trait and the SQLite implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use prompt_core::PromptTree;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};

/// One entry in the session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: i64,
    pub name: String,
}

/// Session directory and snapshot persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create the backing schema if it does not exist yet.
    async fn init(&self) -> Result<()>;

    /// Create a named session holding `tree` as its first snapshot and
    /// return the assigned id.
    async fn create_session(&self, name: &str, tree: &PromptTree) -> Result<i64>;

    /// All sessions, newest first.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    /// Load the last saved snapshot for a session.
    async fn load_session(&self, session_id: i64) -> Result<PromptTree>;

    /// Overwrite a session's snapshot with the current tree.
    async fn save_session(&self, session_id: i64, tree: &PromptTree) -> Result<()>;
}

/// SQLite-backed [`SessionStore`].
///
/// Opens a fresh connection per operation on the blocking thread pool;
/// fine for a single interactive user.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    db_path: PathBuf,
}

impl SqliteSessionStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    async fn with_connection<T, F>(&self, func: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let connection = open_connection(&db_path)?;
            func(&connection)
        })
        .await
        .map_err(|error| StoreError::Task(error.to_string()))?
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn init(&self) -> Result<()> {
        self.with_connection(|connection| {
            connection.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS prompt_sessions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    history TEXT NOT NULL
                );
                "#,
            )?;
            Ok(())
        })
        .await
    }

    async fn create_session(&self, name: &str, tree: &PromptTree) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidName);
        }
        let name = name.to_string();
        let snapshot = serde_json::to_string(tree)?;
        self.with_connection(move |connection| {
            connection.execute(
                "INSERT INTO prompt_sessions (name, history) VALUES (?1, ?2)",
                params![name, snapshot],
            )?;
            Ok(connection.last_insert_rowid())
        })
        .await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.with_connection(|connection| {
            let mut statement =
                connection.prepare("SELECT id, name FROM prompt_sessions ORDER BY id DESC")?;
            let rows = statement.query_map([], |row| {
                Ok(SessionSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row?);
            }
            Ok(sessions)
        })
        .await
    }

    async fn load_session(&self, session_id: i64) -> Result<PromptTree> {
        let snapshot: String = self
            .with_connection(move |connection| {
                connection
                    .query_row(
                        "SELECT history FROM prompt_sessions WHERE id = ?1",
                        params![session_id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or(StoreError::NotFound(session_id))
            })
            .await?;
        Ok(serde_json::from_str(&snapshot)?)
    }

    async fn save_session(&self, session_id: i64, tree: &PromptTree) -> Result<()> {
        let snapshot = serde_json::to_string(tree)?;
        self.with_connection(move |connection| {
            let updated = connection.execute(
                "UPDATE prompt_sessions SET history = ?1 WHERE id = ?2",
                params![snapshot, session_id],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(session_id));
            }
            Ok(())
        })
        .await
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let connection = Connection::open(path)?;
    connection.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        "#,
    )?;
    Ok(connection)
}
