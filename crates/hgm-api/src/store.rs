//! Local key-value store.
//!
//! One JSON object file whose values are strings; structured values are
//! stored as serialized JSON. Every access takes an exclusive lock file so
//! read-modify-write sequences from separate processes do not interleave.

use atomicwrites::{AtomicFile, OverwriteBehavior};
use fslock::LockFile;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::default_home_dir;
use crate::error::{ApiError, Result};

pub const TOKEN_KEY: &str = "userToken";
pub const SESSION_USER_KEY: &str = "sessionUser";
pub const LATEST_FAMILY_KEY: &str = "latestFamilyName";
pub const NOTIFICATIONS_KEY: &str = "notifications";

pub type Entries = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct KvStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl KvStore {
    /// Open (creating the directory if needed) `<dir>/store.json`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join("store.json"),
            lock_path: dir.join("store.json.lock"),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&default_home_dir()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.transaction(|entries| Ok(entries.get(key).cloned()))
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.transaction(|entries| {
            entries.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.transaction(|entries| {
            entries.remove(key);
            Ok(())
        })
    }

    /// Run `f` against the entries while holding the lock. The file is
    /// rewritten only if `f` changed something.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Entries) -> Result<R>) -> Result<R> {
        let lock_err = |e: fslock::Error| {
            ApiError::Storage(format!("Failed to lock {}: {e}", self.lock_path.display()))
        };
        let mut lock = LockFile::open(&self.lock_path).map_err(lock_err)?;
        lock.lock().map_err(lock_err)?;

        let mut entries = self.read_entries()?;
        let before = entries.clone();
        let out = f(&mut entries)?;
        if entries != before {
            self.write_entries(&entries)?;
        }

        lock.unlock().map_err(lock_err)?;
        Ok(out)
    }

    fn read_entries(&self) -> Result<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }
        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::warn!(
                    "Discarding unreadable store {}: {e}",
                    self.path.display()
                );
                Ok(Entries::new())
            }
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<()> {
        let contents = serde_json::to_string_pretty(entries)?;
        AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite)
            .write(|f| {
                f.write_all(contents.as_bytes())?;
                f.flush()
            })
            .map_err(|err| {
                ApiError::Storage(format!("Failed to write {}: {err}", self.path.display()))
            })
    }
}
