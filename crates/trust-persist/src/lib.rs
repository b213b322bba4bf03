//! JSON file-backed persistence for TrustHub local state.
//!
//! A [`JsonStore`] owns one snapshot file, `<dir>/<name>.json`. Stores keep
//! their working state in memory and call [`JsonStore::save`] after each
//! mutation; [`JsonStore::load`] restores it on start-up.
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//! use trust_persist::JsonStore;
//!
//! let store = JsonStore::new(Path::new("/var/lib/trusthub"), "balances");
//! let mut balances: HashMap<String, u64> = store.load();
//! balances.insert("wallet".into(), 10);
//! store.save(&balances).ok();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A single JSON snapshot file.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Creates a store for `<dir>/<name>.json`. Nothing touches the disk yet.
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            path: dir.join(format!("{name}.json")),
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot, falling back to `T::default()` when the file is
    /// missing or unreadable.
    pub fn load<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot on disk");
                return T::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read snapshot");
                return T::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt snapshot, starting empty");
                T::default()
            }
        }
    }

    /// Writes the snapshot atomically (temp file + rename).
    pub fn save<T>(&self, value: &T) -> io::Result<()>
    where
        T: Serialize + ?Sized,
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
    }

    /// Removes the snapshot file if present.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
