use std::fmt;

/// Why a reconcile or rename request was refused. Callers must be able to
/// tell "your name is invalid" apart from "someone already claimed this".
#[derive(Debug)]
pub enum ReconcileError {
    /// The submitted name had no [A-Za-z0-9] characters left after sanitization.
    EmptyName,
    /// Another entity already holds the requested name.
    NameTaken,
    /// The rename target does not exist.
    UnknownEntity,
    DatabaseError(rusqlite::Error),
}

impl From<rusqlite::Error> for ReconcileError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ReconcileError::NameTaken
            }
            _ => ReconcileError::DatabaseError(err),
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::EmptyName => write!(f, "name is empty after sanitization"),
            ReconcileError::NameTaken => write!(f, "name is already taken"),
            ReconcileError::UnknownEntity => write!(f, "tracked entity not found"),
            ReconcileError::DatabaseError(e) => write!(f, "database error: {}", e),
        }
    }
}
