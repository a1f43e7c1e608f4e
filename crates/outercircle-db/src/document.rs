use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use outercircle_types::models::{Code, CodeGroup, Message, NewMessage};
use tracing::{info, warn};

use crate::MessageStore;
use crate::error::{Result, StoreError};

type Document = BTreeMap<Code, Vec<Message>>;

/// Flat-document backend: the whole dataset is one JSON object mapping each
/// code to its messages in insertion order.
///
/// Every operation loads the document from disk and every write rewrites it
/// in full. All of them run under `lock`, so two concurrent appends can never
/// both load the same version and drop each other's message.
pub struct DocumentStore {
    path: PathBuf,
    recover_corrupt: bool,
    lock: Mutex<()>,
}

impl DocumentStore {
    /// Open (or lazily create) the document at `path`.
    ///
    /// The document is loaded once up front so a corrupt file is reported at
    /// startup rather than on the first request.
    pub fn open(path: impl Into<PathBuf>, recover_corrupt: bool) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let store = Self {
            path,
            recover_corrupt,
            lock: Mutex::new(()),
        };
        let codes = store.read(|doc| doc.len())?;

        info!(
            "Document store opened at {} ({} codes)",
            store.path.display(),
            codes
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Document) -> T,
    {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let doc = self.load()?;
        Ok(f(&doc))
    }

    /// Load, mutate, save. Nothing is written if `f` fails.
    fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document) -> Result<T>,
    {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut doc = self.load()?;
        let out = f(&mut doc)?;
        self.save(&doc)?;
        Ok(out)
    }

    fn load(&self) -> Result<Document> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Document::new());
        }

        match serde_json::from_slice(&bytes) {
            Ok(doc) => Ok(doc),
            Err(source) if self.recover_corrupt => {
                warn!(
                    "Document {} is corrupt ({}), continuing with an empty store",
                    self.path.display(),
                    source
                );
                Ok(Document::new())
            }
            Err(source) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, doc: &Document) -> Result<()> {
        replace_file(&self.temp_path(), &self.path, doc)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// Write to `tmp`, then rename over `dest` so a reader never sees a
/// half-written file. `tmp` is removed if either step fails.
fn replace_file(tmp: &Path, dest: &Path, doc: &Document) -> Result<()> {
    let written =
        write_json(tmp, doc).and_then(|()| fs::rename(tmp, dest).map_err(StoreError::from));
    if written.is_err() {
        let _ = fs::remove_file(tmp);
    }
    written
}

fn write_json(path: &Path, doc: &Document) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, doc)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

impl MessageStore for DocumentStore {
    fn code_exists(&self, code: &Code) -> Result<bool> {
        self.read(|doc| doc.contains_key(code))
    }

    fn create_code(&self, code: &Code) -> Result<()> {
        self.write(|doc| {
            if doc.contains_key(code) {
                return Err(StoreError::DuplicateKey(code.clone()));
            }
            doc.insert(code.clone(), Vec::new());
            Ok(())
        })
    }

    fn append_message(&self, code: &Code, message: NewMessage) -> Result<Message> {
        self.write(|doc| {
            let messages = doc
                .get_mut(code)
                .ok_or_else(|| StoreError::UnknownCode(code.clone()))?;
            let message = message.stamped();
            messages.push(message.clone());
            Ok(message)
        })
    }

    fn list_all_grouped(&self) -> Result<Vec<CodeGroup>> {
        self.read(|doc| {
            doc.iter()
                .filter(|(_, messages)| !messages.is_empty())
                .map(|(code, messages)| {
                    // Newest insertion first, then a stable sort keeps that
                    // order among equal timestamps.
                    let mut messages: Vec<Message> = messages.iter().rev().cloned().collect();
                    messages.sort_by(|a, b| b.timestamp_utc.cmp(&a.timestamp_utc));
                    CodeGroup {
                        code: code.clone(),
                        messages,
                    }
                })
                .collect()
        })
    }
}
