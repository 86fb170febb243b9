//! Blob slot contracts with SQLite and in-memory implementations.
//!
//! # Invariants
//! - `write_blob` is an upsert: last write wins for a key.
//! - `read_blob` returns `None` for keys never written or since removed.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for slot persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Slot key is blank.
    InvalidKey(String),
    /// Backend refused the write, e.g. quota or read-only media.
    Rejected(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidKey(key) => write!(f, "invalid slot key: `{key}`"),
            Self::Rejected(reason) => write!(f, "slot write rejected: {reason}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidKey(_) | Self::Rejected(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Engine(value))
    }
}

/// Durable key-value slot holding serialized documents.
pub trait BlobRepository {
    fn read_blob(&self, key: &str) -> RepoResult<Option<String>>;
    fn write_blob(&mut self, key: &str, value: &str) -> RepoResult<()>;
    fn remove_blob(&mut self, key: &str) -> RepoResult<bool>;
}

/// SQLite-backed slot repository over the `kv_slots` table.
///
/// Owns its connection: the store built on top lives for the whole session.
pub struct SqliteBlobRepository {
    conn: Connection,
}

impl SqliteBlobRepository {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl BlobRepository for SqliteBlobRepository {
    fn read_blob(&self, key: &str) -> RepoResult<Option<String>> {
        let key = checked_key(key)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_blob(&mut self, key: &str, value: &str) -> RepoResult<()> {
        let key = checked_key(key)?;
        self.conn.execute(
            "INSERT INTO kv_slots (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_blob(&mut self, key: &str) -> RepoResult<bool> {
        let key = checked_key(key)?;
        let changed = self
            .conn
            .execute("DELETE FROM kv_slots WHERE key = ?1;", [key])?;
        Ok(changed > 0)
    }
}

/// In-memory slot repository for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobRepository {
    slots: HashMap<String, String>,
}

impl MemoryBlobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one slot, e.g. with a document written by an older build.
    pub fn with_slot(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.insert(key.into(), value.into());
        self
    }
}

impl BlobRepository for MemoryBlobRepository {
    fn read_blob(&self, key: &str) -> RepoResult<Option<String>> {
        let key = checked_key(key)?;
        Ok(self.slots.get(key).cloned())
    }

    fn write_blob(&mut self, key: &str, value: &str) -> RepoResult<()> {
        let key = checked_key(key)?;
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_blob(&mut self, key: &str) -> RepoResult<bool> {
        let key = checked_key(key)?;
        Ok(self.slots.remove(key).is_some())
    }
}

fn checked_key(key: &str) -> RepoResult<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidKey(key.to_string()));
    }
    Ok(trimmed)
}
