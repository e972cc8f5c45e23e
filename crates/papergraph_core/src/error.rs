//! Error taxonomy shared by every core operation.
//!
//! # Invariants
//! - Callers only ever see one of four kinds: not found, conflict,
//!   validation, internal.
//! - SQLite constraint failures are classified once, here.

use crate::db::DbError;
use rusqlite::ffi;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type CoreResult<T> = Result<T, CoreError>;

/// Record family named by a [`CoreError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Paper,
    Note,
    Tag,
    /// A paper or note whose kind is not known to the caller.
    Entity,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Paper => "paper",
            Self::Note => "note",
            Self::Tag => "tag",
            Self::Entity => "entity",
        })
    }
}

/// Stable error category surfaced to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: Uuid },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("internal store error: {0}")]
    Internal(#[source] DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl CoreError {
    pub fn not_found(kind: RecordKind, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Internal(_) | Self::InvalidData(_) => ErrorKind::Internal,
        }
    }
}

impl From<DbError> for CoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Internal(other),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(value: rusqlite::Error) -> Self {
        if let Some(message) = unique_violation_message(&value) {
            return Self::Conflict(message);
        }
        Self::Internal(DbError::Sqlite(value))
    }
}

fn unique_violation_message(err: &rusqlite::Error) -> Option<String> {
    match err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Some(
                message
                    .clone()
                    .unwrap_or_else(|| "uniqueness constraint violated".to_string()),
            )
        }
        _ => None,
    }
}

/// Returns whether `err` is a foreign key violation.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

#[cfg(test)]
mod tests {
    use super::{CoreError, ErrorKind, RecordKind};
    use rusqlite::Connection;
    use uuid::Uuid;

    #[test]
    fn unique_violation_maps_to_conflict() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t VALUES ('a');", [])
            .unwrap_err();
        assert_eq!(CoreError::from(err).kind(), ErrorKind::Conflict);
    }

    #[test]
    fn other_sqlite_errors_map_to_internal() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.execute("SELECT * FROM missing;", []).unwrap_err();
        assert_eq!(CoreError::from(err).kind(), ErrorKind::Internal);
    }

    #[test]
    fn not_found_display_names_kind_and_id() {
        let id = Uuid::nil();
        let err = CoreError::not_found(RecordKind::Tag, id);
        assert_eq!(err.to_string(), format!("tag not found: {id}"));
        assert_eq!(err.kind().as_str(), "not_found");
    }
}
