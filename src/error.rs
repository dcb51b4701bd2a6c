//! Error type for everything that talks to the attendance store.

use thiserror::Error;

/// Any failure raised while looking up or saving a sheet. Callers abort the
/// running operation and surface the message.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store rejected or failed a statement
    #[error("{0}")]
    Sql(#[from] rusqlite::Error),

    /// The workspace database could not be opened
    #[error("could not open workspace: {message}")]
    Open { message: String },
}

impl From<anyhow::Error> for PersistenceError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<rusqlite::Error>() {
            Ok(e) => PersistenceError::Sql(e),
            Err(other) => PersistenceError::Open {
                message: other.to_string(),
            },
        }
    }
}
