//! Snapshot persistence backends.
//!
//! # Responsibility
//! - Persist one serialized payload per well-known key.
//! - Hide whether the payload lives in memory, in a file or in SQLite.
//!
//! # Invariants
//! - `load` of a never-saved key returns `Ok(None)`, not an error.
//! - `save` replaces the previous payload for the key as a whole.

use crate::db::DbError;
use crate::repo::day_row_repo::RepoError;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub type BackendResult<T> = Result<T, BackendError>;

/// Persistence failure underneath the menu store.
#[derive(Debug)]
pub enum BackendError {
    Io(std::io::Error),
    Db(DbError),
    /// Authoritative day-row store failed.
    Authority(RepoError),
    /// Stored payload exists but cannot be decoded or violates bucket rules.
    Corrupt(String),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Authority(err) => write!(f, "authoritative store: {err}"),
            Self::Corrupt(message) => write!(f, "corrupt menu snapshot: {message}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Authority(err) => Some(err),
            Self::Corrupt(_) => None,
        }
    }
}

impl From<std::io::Error> for BackendError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DbError> for BackendError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for BackendError {
    fn from(value: RepoError) -> Self {
        Self::Authority(value)
    }
}

/// Key-value slot storage for serialized snapshots.
pub trait SnapshotBackend: Send + Sync {
    /// Short stable name used in log events.
    fn backend_tag(&self) -> &'static str;
    fn load(&self, key: &str) -> BackendResult<Option<String>>;
    fn save(&self, key: &str, payload: &str) -> BackendResult<()>;
}

/// Process-local backend; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds a slot, e.g. with a payload written by another process.
    pub fn with_payload(key: impl Into<String>, payload: impl Into<String>) -> Self {
        let backend = Self::default();
        backend
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), payload.into());
        backend
    }
}

impl SnapshotBackend for MemoryBackend {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    fn load(&self, key: &str) -> BackendResult<Option<String>> {
        Ok(self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn save(&self, key: &str, payload: &str) -> BackendResult<()> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotBackend for FileBackend {
    fn backend_tag(&self) -> &'static str {
        "file"
    }

    fn load(&self, key: &str) -> BackendResult<Option<String>> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, payload: &str) -> BackendResult<()> {
        fs::create_dir_all(&self.dir)?;
        let target = self.slot_path(key);
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&staging, payload)?;
        // Rename keeps readers from ever seeing a half-written file.
        fs::rename(&staging, &target)?;
        Ok(())
    }
}
