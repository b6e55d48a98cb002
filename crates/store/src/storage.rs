//! Persistence of top-level state slices as JSON values.

use parking_lot::RwLock;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, warn};

pub const CHAINS_KEY: &str = "chains";
pub const QUERIES_KEY: &str = "queries";
pub const PROJECTS_KEY: &str = "projects";
pub const SELECTED_PROJECT_KEY: &str = "selected_project";
pub const USER_KEY: &str = "user";
pub const REFRESH_ENABLED_KEY: &str = "refresh_enabled";
pub const REFRESH_SECONDS_KEY: &str = "refresh_seconds";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Load/save interface over named JSON slices.
///
/// Absent keys mean "use the default".
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError>;
}

/// Store backed by a shared in-memory map.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore(Arc<RwLock<BTreeMap<String, Value>>>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.0.read().get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.0.write().insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// One `<key>.json` file per slice inside a state directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open a state directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonDirStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let text = match fs::read_to_string(self.path(key)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Ignoring unparseable state slice");
                Ok(None)
            }
        }
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;

        // Readers only ever see a complete file
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)
            .and_then(|()| fs::rename(&tmp, &path))
            .map_err(|source| StorageError::Io {
                key: key.to_string(),
                source,
            })?;

        debug!(key, path = %path.display(), "Saved state slice");
        Ok(())
    }
}
