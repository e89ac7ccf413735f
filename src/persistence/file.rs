//! JSON file backed key-value store.

use super::KeyValueStore;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stores all keys in one JSON object on disk.
///
/// Every `set` rewrites the file through a temp file and a rename, so a crash
/// leaves either the old or the new contents.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store at the configured (or platform default) location.
    pub fn from_config(storage: &crate::config::StorageConfig) -> Result<Self> {
        Ok(Self::new(storage.resolve_path()?))
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::persistence(format!("invalid path {}", self.path.display())))?;
        let tmp = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        let content = serde_json::to_string_pretty(entries)?;
        if let Err(e) = Self::write_synced(&tmp, content.as_bytes())
            .and_then(|()| std::fs::rename(&tmp, &self.path))
        {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        // Persist the rename itself. Not supported for directories everywhere.
        if let Some(parent) = self.path.parent()
            && let Ok(dir) = File::open(parent)
            && let Err(e) = dir.sync_all()
        {
            tracing::debug!("Could not sync {}: {}", parent.display(), e);
        }
        Ok(())
    }

    /// Data must reach the disk before the rename makes it visible.
    fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(content)?;
        file.sync_all()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| Error::persistence(e.to_string()))?;

        // A corrupt file is replaced.
        let mut entries = self.read_all().unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable {}: {}", self.path.display(), e);
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{PersistedPreferences, PreferenceAdapter, WATCHLIST_KEY};
    use crate::state::Watchlist;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("prefs.json"));
        assert_eq!(store.get(WATCHLIST_KEY).unwrap(), None);
    }

    #[test]
    fn test_set_creates_parent_dirs_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("prefs.json");
        let store = FileStore::new(&path);
        store.set("beginner-mode", "false").unwrap();
        store.set(WATCHLIST_KEY, "[\"AAPL\"]").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("beginner-mode").unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(
            reopened.get(WATCHLIST_KEY).unwrap().as_deref(),
            Some("[\"AAPL\"]")
        );

        // No temp files left behind
        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .map(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_write_replaces_file_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = FileStore::new(&path);

        store.set("watchlist", r#"["AAPL"]"#).unwrap();
        store.set("watchlist", r#"["AAPL","TSLA"]"#).unwrap();
        store.set("beginner-mode", "false").unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["prefs.json"]);

        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["watchlist"], r#"["AAPL","TSLA"]"#);
        assert_eq!(on_disk["beginner-mode"], "false");
    }

    #[test]
    fn test_corrupt_file_is_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path);
        assert!(store.get(WATCHLIST_KEY).is_err());
        assert_eq!(
            PreferenceAdapter::new(FileStore::new(&path)).load(),
            PersistedPreferences::default()
        );

        store.set(WATCHLIST_KEY, "[]").unwrap();
        assert_eq!(store.get(WATCHLIST_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_adapter_survives_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = PersistedPreferences {
            watchlist: Watchlist::from_symbols(["NVDA", "SPY"]),
            beta_mode: false,
        };
        PreferenceAdapter::new(FileStore::new(&path))
            .save(&prefs)
            .unwrap();

        assert_eq!(PreferenceAdapter::new(FileStore::new(&path)).load(), prefs);
    }
}
