//! `PositionStore` implementations.
//!
//! - `JsonFileStore`: one JSON document holding every cover's last estimate,
//!   replaced atomically on each save. Saves from any number of stores or
//!   processes on the same path are serialized by an advisory lock on
//!   `<path>.lock`.
//! - `MemoryStore`: in-process map, for tests and runs without a state file.

use chronoshade_traits::{BoxError, PersistedState, PositionStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Record {
    position: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tilt: Option<u8>,
}

impl From<&PersistedState> for Record {
    fn from(s: &PersistedState) -> Self {
        Self {
            position: s.position,
            tilt: s.tilt,
        }
    }
}

impl From<Record> for PersistedState {
    fn from(r: Record) -> Self {
        Self {
            position: r.position,
            tilt: r.tilt,
        }
    }
}

/// State file shaped as `{"<cover id>": {"position": 40, "tilt": 10}, ...}`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Record>, BoxError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// Exclusive lock held for one read-modify-write; released on drop.
    fn lock(&self) -> std::io::Result<File> {
        std::fs::create_dir_all(parent_dir(&self.path))?;
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(PathBuf::from(name))?;
        file.lock()?;
        Ok(file)
    }
}

impl PositionStore for JsonFileStore {
    fn load(&self, cover_id: &str) -> Result<Option<PersistedState>, BoxError> {
        Ok(self.read_all()?.get(cover_id).copied().map(Into::into))
    }

    fn save(&mut self, cover_id: &str, state: &PersistedState) -> Result<(), BoxError> {
        let _guard = self.lock()?;
        let mut all = self.read_all()?;
        all.insert(cover_id.to_owned(), state.into());
        let json = serde_json::to_vec_pretty(&all)?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Replace `path` with `bytes` so readers see either the old or the new file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BoxError> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// Shared in-memory store; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    states: HashMap<String, PersistedState>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one cover's state.
    pub fn with_state(cover_id: &str, state: PersistedState) -> Self {
        let store = Self::default();
        if let Ok(mut inner) = store.inner.lock() {
            inner.states.insert(cover_id.to_owned(), state);
        }
        store
    }

    pub fn get(&self, cover_id: &str) -> Option<PersistedState> {
        self.inner
            .lock()
            .ok()
            .and_then(|i| i.states.get(cover_id).copied())
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.inner.lock().map(|i| i.saves).unwrap_or(0)
    }
}

impl PositionStore for MemoryStore {
    fn load(&self, cover_id: &str) -> Result<Option<PersistedState>, BoxError> {
        Ok(self.get(cover_id))
    }

    fn save(&mut self, cover_id: &str, state: &PersistedState) -> Result<(), BoxError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| -> BoxError { "memory store poisoned".into() })?;
        inner.states.insert(cover_id.to_owned(), *state);
        inner.saves += 1;
        Ok(())
    }
}
