use thiserror::Error;

use crate::types::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("flag already exists")]
    AlreadyExists,

    #[error("invalid action")]
    InvalidAction,

    #[error("id required")]
    IdRequired,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("decision logic api request failed: {0}")]
    Transport(String),

    #[error("entity kind mismatch: expected {expected}, found {found}")]
    EntityKindMismatch {
        expected: EntityKind,
        found: EntityKind,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
