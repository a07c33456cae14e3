use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuizError {
    /// The catalog source could not be read. Fatal for the session.
    #[error("failed to read idiom catalog at {path}: {source}")]
    CatalogLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog was read but is not a valid record list.
    #[error("idiom catalog is malformed: {0}")]
    CatalogParse(#[source] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// User-supplied override text is not valid JSON. The store is untouched.
    #[error("override payload is not valid JSON: {0}")]
    InvalidImport(#[source] serde_json::Error),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("could not encode {bin}: {source}")]
    Encode {
        bin: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QuizError>;
