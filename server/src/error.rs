//! Error handling.

use std::error::Error as StdError;

use anyhow::Error as AnyError;
use displaydoc::Display;
use sea_orm::{sqlx, DbErr, RuntimeErr, SqlErr};

use chacra::error::ChacraError;

pub type ServerResult<T> = Result<T, ServerError>;

/// An error.
#[derive(Debug, Display)]
pub enum ServerError {
    /// The requested project does not exist.
    NoSuchProject,

    /// The requested repo does not exist.
    NoSuchRepo,

    /// The requested binary does not exist.
    NoSuchBinary,

    /// The repo belongs to another project.
    RepoProjectMismatch,

    /// The repo for this binary was concurrently modified. Try again.
    GroupingConflict,

    /// A concurrent write got in the way. Try again.
    WriteConflict,

    /// The binary was accessed after its session was closed.
    DetachedRecordAccess,

    /// Database error: {0}
    DatabaseError(AnyError),

    /// {0}
    ChacraError(ChacraError),
}

impl ServerError {
    pub fn database_error(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::DatabaseError(AnyError::new(error))
    }

    /// Wraps an error from a write, reporting lock contention as `conflict`.
    ///
    /// Concurrent writers can fail on busy or locked SQLite databases,
    /// Postgres serialization failures and deadlocks, or a unique index
    /// that another transaction just claimed. All of them succeed when
    /// the write is repeated.
    pub fn write_error(error: DbErr, conflict: Self) -> Self {
        if is_contention(&error) {
            tracing::debug!("Write lost a race: {}", error);
            conflict
        } else {
            Self::database_error(error)
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NoSuchProject => "NoSuchProject",
            Self::NoSuchRepo => "NoSuchRepo",
            Self::NoSuchBinary => "NoSuchBinary",
            Self::RepoProjectMismatch => "RepoProjectMismatch",
            Self::GroupingConflict => "GroupingConflict",
            Self::WriteConflict => "WriteConflict",
            Self::DetachedRecordAccess => "DetachedRecordAccess",
            Self::DatabaseError(_) => "DatabaseError",
            Self::ChacraError(e) => e.name(),
        }
    }

    /// Returns whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::GroupingConflict | Self::WriteConflict)
    }

    /// Returns whether the error was caused by invalid input.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Self::RepoProjectMismatch => true,
            Self::ChacraError(e) => e.is_validation_error(),
            _ => false,
        }
    }
}

impl StdError for ServerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::DatabaseError(e) => Some(&**e),
            Self::ChacraError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ChacraError> for ServerError {
    fn from(error: ChacraError) -> Self {
        Self::ChacraError(error)
    }
}

/// Returns whether a database error was caused by a concurrent writer.
fn is_contention(error: &DbErr) -> bool {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = error.sql_err() {
        return true;
    }

    let runtime = match error {
        DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return false,
    };

    let code = match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(e)) => e.code(),
        _ => return false,
    };

    match code.as_deref() {
        // Postgres: serialization_failure, deadlock_detected
        Some("40001") | Some("40P01") => true,

        // SQLite: SQLITE_BUSY and SQLITE_LOCKED, including extended codes
        Some(code) => code
            .parse::<i32>()
            .map(|code| matches!(code & 0xff, 5 | 6))
            .unwrap_or(false),

        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_passthrough() {
        let e = ServerError::write_error(
            DbErr::Custom("disk on fire".to_string()),
            ServerError::GroupingConflict,
        );

        assert_eq!("DatabaseError", e.name());
        assert!(!e.is_transient());
    }

    #[test]
    fn test_conflicts_are_transient() {
        assert!(ServerError::GroupingConflict.is_transient());
        assert!(ServerError::WriteConflict.is_transient());
        assert!(!ServerError::NoSuchBinary.is_transient());
    }
}
