//! Planner database: one SQLite file holding the document slot table.
//!
//! Connections come from `open_db`/`open_db_in_memory` with the schema
//! already at `migrations::latest_version()`; callers never see a
//! half-migrated database.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

/// Failure while opening or migrating the planner database.
#[derive(Debug)]
pub enum DbError {
    /// Error reported by SQLite itself.
    Engine(rusqlite::Error),
    /// No database path was given.
    EmptyPath,
    /// The file was written by a newer build; opening it could lose data.
    SchemaTooNew { found: u32, supported: u32 },
}

pub type DbResult<T> = Result<T, DbError>;

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "sqlite: {err}"),
            Self::EmptyPath => f.write_str("planner database path is empty"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "planner database uses schema {found}, this build understands up to {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let Self::Engine(err) = self {
            Some(err)
        } else {
            None
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Engine(value)
    }
}
