pub mod document;
pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;

use outercircle_types::models::{Code, CodeGroup, Message, NewMessage};

pub use document::DocumentStore;
pub use error::{Result, StoreError};
pub use sqlite::SqliteStore;

/// Persistence contract shared by every backend.
///
/// Implementations are blocking; async callers should run them on a
/// blocking thread.
pub trait MessageStore: Send + Sync {
    /// True iff `code` has been recorded with [`MessageStore::create_code`].
    fn code_exists(&self, code: &Code) -> Result<bool>;

    /// Record a new code. Fails with [`StoreError::DuplicateKey`] rather than
    /// overwriting an existing one.
    fn create_code(&self, code: &Code) -> Result<()>;

    /// Append a message to an existing code, stamping the current time if the
    /// message carries none. Fails with [`StoreError::UnknownCode`] and writes
    /// nothing if the code was never created.
    fn append_message(&self, code: &Code, message: NewMessage) -> Result<Message>;

    /// Every message grouped by code: codes ascending, messages newest first.
    /// Codes without messages are left out.
    fn list_all_grouped(&self) -> Result<Vec<CodeGroup>>;
}

/// Which backend to construct, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite { path: PathBuf },
    Document { path: PathBuf, recover_corrupt: bool },
}

pub fn open(config: &StoreConfig) -> Result<Arc<dyn MessageStore>> {
    let store: Arc<dyn MessageStore> = match config {
        StoreConfig::Sqlite { path } => Arc::new(SqliteStore::open(path)?),
        StoreConfig::Document {
            path,
            recover_corrupt,
        } => Arc::new(DocumentStore::open(path, *recover_corrupt)?),
    };
    Ok(store)
}
