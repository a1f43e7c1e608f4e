use std::path::PathBuf;

use outercircle_types::models::Code;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("code {0} already exists")]
    DuplicateKey(Code),

    #[error("unknown code {0}")]
    UnknownCode(Code),

    #[error("document {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid stored timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// True for failures of the backing storage itself, as opposed to
    /// rejections of the request (duplicate or unknown code).
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, Self::DuplicateKey(_) | Self::UnknownCode(_))
    }
}
