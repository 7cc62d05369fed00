//! Session context: the currently selected organization and project
//!
//! The context is an explicit value handed to whoever needs it. It is
//! restored from a [`KeyValueStore`] at startup and written back when it
//! changes or the app exits.

use fs2::FileExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

const KEY_ORGANIZATION: &str = "current_organization";
const KEY_PROJECT: &str = "current_project";
const SESSION_FILE: &str = "session.json";
const LOCK_TIMEOUT_SECS: u64 = 5;
const LOCK_RETRY_MS: u64 = 25;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Timed out waiting for store lock ({0}s)")]
    LockTimeout(u64),
}

/// Minimal persistent key-value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, guarded by an advisory lock file so two running
/// consoles don't interleave writes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

struct StoreLock {
    file: fs::File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the orgpulse config directory.
    pub fn in_config_dir() -> Option<Self> {
        crate::config::Config::config_dir().map(|dir| Self::new(dir.join(SESSION_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<StoreLock, StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.path.with_extension("lock"))?;

        let start = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => return Ok(StoreLock { file }),
                Err(err) => {
                    if err.kind() != ErrorKind::WouldBlock {
                        return Err(err.into());
                    }
                    if start.elapsed() >= Duration::from_secs(LOCK_TIMEOUT_SECS) {
                        return Err(StoreError::LockTimeout(LOCK_TIMEOUT_SECS));
                    }
                    std::thread::sleep(Duration::from_millis(LOCK_RETRY_MS));
                }
            }
        }
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Keep the unreadable file next to the store for inspection.
    fn set_aside_corrupt(&self) {
        let corrupt_path = self.path.with_extension("json.corrupt");
        if let Err(err) = fs::rename(&self.path, &corrupt_path) {
            tracing::warn!("failed to set aside corrupt session store: {}", err);
        }
    }

    fn write_all(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)?;
        crate::util::write_atomic(&self.path, &content)?;
        Ok(())
    }

    fn update(&mut self, f: impl FnOnce(&mut Map<String, Value>)) -> Result<(), StoreError> {
        let _lock = self.lock()?;
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StoreError::Corrupt(err)) => {
                tracing::warn!(
                    "session store {} was corrupted, starting fresh: {}",
                    self.path.display(),
                    err
                );
                self.set_aside_corrupt();
                Map::new()
            }
            Err(err) => return Err(err),
        };
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .read_all()?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key.to_string(), Value::String(value.to_string()));
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// What the user is currently looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
}

impl SessionContext {
    /// Restore from `store`; unreadable stores yield an empty context.
    pub fn restore(store: &dyn KeyValueStore) -> Self {
        let read = |key: &str| match store.get(key) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(err) => {
                tracing::warn!("failed to restore session key {}: {}", key, err);
                None
            }
        };
        let organization_id = read(KEY_ORGANIZATION);
        // A project only makes sense inside its organization.
        let project_id = organization_id.as_ref().and_then(|_| read(KEY_PROJECT));
        Self {
            organization_id,
            project_id,
        }
    }

    pub fn persist(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        match &self.organization_id {
            Some(id) => store.set(KEY_ORGANIZATION, id)?,
            None => store.remove(KEY_ORGANIZATION)?,
        }
        match &self.project_id {
            Some(id) => store.set(KEY_PROJECT, id)?,
            None => store.remove(KEY_PROJECT)?,
        }
        Ok(())
    }

    /// Select an organization. Returns true when this changed the context,
    /// in which case the selected project is cleared.
    pub fn switch_organization(&mut self, organization_id: &str) -> bool {
        if self.organization_id.as_deref() == Some(organization_id) {
            return false;
        }
        self.organization_id = Some(organization_id.to_string());
        self.project_id = None;
        true
    }

    pub fn switch_project(&mut self, project_id: Option<&str>) -> bool {
        let next = project_id.map(str::to_string);
        if self.project_id == next {
            return false;
        }
        self.project_id = next;
        true
    }

    /// Forget everything (logout).
    pub fn clear(&mut self) {
        self.organization_id = None;
        self.project_id = None;
    }
}
