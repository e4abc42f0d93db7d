//! Durable storage contracts
//!
//! The platform's persistence needs reduce to two narrow operations:
//! "read / atomically replace a single document" and "append a line to a
//! log". Components depend on these traits, not on a file format, so any
//! embedded store satisfying the contract can be substituted.
//!
//! File-backed implementations are provided here. Writes are scoped
//! (open-write-close per operation) so interleaved requests never contend
//! on a held-open handle, and a failed write is reported to the caller,
//! who logs and continues on in-memory state.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{PomonaError, Result};

/// Single-document storage: read current state, atomically replace it.
pub trait DocumentStore: Send + Sync {
    /// Read the current document for `key`. Missing or unreadable documents
    /// yield `None` — a fresh start, never an error.
    fn read(&self, key: &str) -> Option<Value>;

    /// Atomically replace the document for `key`.
    fn replace(&self, key: &str, doc: &Value) -> Result<()>;
}

/// Append-only record log.
pub trait AppendLog: Send + Sync {
    /// Append one record. Open-write-close per call.
    fn append(&self, record: &Value) -> Result<()>;

    /// Read every intact record in order. Corrupt lines are skipped.
    fn read_all(&self) -> Vec<Value>;

    /// Read up to the last `n` intact records.
    fn read_last(&self, n: usize) -> Vec<Value> {
        let mut all = self.read_all();
        if all.len() > n {
            all.drain(..all.len() - n);
        }
        all
    }
}

/// Typed read through a [`DocumentStore`]
pub fn read_doc<T: DeserializeOwned>(store: &dyn DocumentStore, key: &str) -> Option<T> {
    let value = store.read(key)?;
    match serde_json::from_value(value) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(key, error = %e, "stored document does not match expected shape, ignoring");
            None
        }
    }
}

/// Typed replace through a [`DocumentStore`]
pub fn replace_doc<T: Serialize>(store: &dyn DocumentStore, key: &str, doc: &T) -> Result<()> {
    let value = serde_json::to_value(doc)?;
    store.replace(key, &value)
}

/// Typed append through an [`AppendLog`]
pub fn append_record<T: Serialize>(log: &dyn AppendLog, record: &T) -> Result<()> {
    let value = serde_json::to_value(record)?;
    log.append(&value)
}

/// Typed tail read through an [`AppendLog`]; records that fail to
/// deserialize are skipped.
pub fn read_last_records<T: DeserializeOwned>(log: &dyn AppendLog, n: usize) -> Vec<T> {
    log.read_last(n)
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

/// One JSON file per key under a root directory, replaced via temp file +
/// rename so readers never observe a partial write.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn doc_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl DocumentStore for JsonFileStore {
    fn read(&self, key: &str) -> Option<Value> {
        let path = self.doc_path(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => return None,
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "corrupt document, treating as absent");
                None
            }
        }
    }

    fn replace(&self, key: &str, doc: &Value) -> Result<()> {
        let path = self.doc_path(key);
        let tmp = self.root.join(format!(".{}.tmp", key));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(serde_json::to_string_pretty(doc)?.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)
            .map_err(|e| PomonaError::Storage(format!("replace {}: {}", key, e)))
    }
}

/// Newline-delimited JSON log file.
pub struct JsonlFileLog {
    path: PathBuf,
}

impl JsonlFileLog {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AppendLog for JsonlFileLog {
    fn append(&self, record: &Value) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn read_all(&self) -> Vec<Value> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => return Vec::new(),
        };
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }
}
