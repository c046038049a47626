//! Checkpoint store (cache.json)
//!
//! Remembers, per feed URL, the fingerprint of the newest row seen on the
//! previous poll. On disk it is a JSON object of hex SourceKey to hex
//! Fingerprint.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tenderwatch_common::checksum::fingerprint;
use tenderwatch_common::{Fingerprint, Result, SourceKey, TenderwatchError};
use tracing::{debug, info};

/// Store shared between concurrent syncs
pub type SharedStore = Arc<Mutex<FingerprintStore>>;

/// Lock a shared store, mapping a poisoned lock to an error
pub fn lock_store(store: &SharedStore) -> Result<MutexGuard<'_, FingerprintStore>> {
    store
        .lock()
        .map_err(|e| TenderwatchError::LockPoisoned(e.to_string()))
}

/// Durable map of SourceKey to the last seen row fingerprint
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintStore {
    path: PathBuf,
    checkpoints: BTreeMap<SourceKey, Fingerprint>,
}

impl FingerprintStore {
    /// Empty store backed by `path`; nothing is read or written
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            checkpoints: BTreeMap::new(),
        }
    }

    /// Load the store from `path`
    ///
    /// A missing or empty file gives an empty store. Entries that are not
    /// valid hex fingerprints are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut store = Self::new(path);

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No checkpoint file, starting empty");
                return Ok(store);
            },
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(store);
        }

        let entries: Map<String, Value> = serde_json::from_str(&content)?;
        for (key, value) in entries {
            let Some(value) = value.as_str() else {
                debug!(key = %key, "Skipping non-string checkpoint entry");
                continue;
            };
            match (key.parse::<SourceKey>(), value.parse::<Fingerprint>()) {
                (Ok(source), Ok(fp)) => {
                    store.checkpoints.insert(source, fp);
                },
                (Err(e), _) | (_, Err(e)) => {
                    debug!(key = %key, error = %e, "Skipping corrupted checkpoint entry");
                },
            }
        }

        debug!(path = %path.display(), entries = store.len(), "Loaded checkpoints");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn lookup(&self, source: &SourceKey) -> Option<Fingerprint> {
        self.checkpoints.get(source).copied()
    }

    /// Record `raw_record` as the newest row seen for `source`
    pub fn update(&mut self, source: SourceKey, raw_record: &[u8]) {
        self.checkpoints.insert(source, fingerprint(raw_record));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceKey, &Fingerprint)> {
        self.checkpoints.iter()
    }

    /// Write the store to its file, replacing it atomically
    ///
    /// An empty store removes the file instead.
    pub fn persist(&self) -> Result<()> {
        if self.checkpoints.is_empty() {
            return remove_if_exists(&self.path);
        }

        let entries: BTreeMap<String, String> = self
            .checkpoints
            .iter()
            .map(|(source, fp)| (source.to_string(), fp.to_hex()))
            .collect();
        let content = serde_json::to_string_pretty(&entries)?;

        write_atomic(&self.path, content)?;

        debug!(path = %self.path.display(), entries = entries.len(), "Persisted checkpoints");
        Ok(())
    }

    /// Forget every checkpoint and remove the backing file
    pub fn clear(&mut self) -> Result<()> {
        self.checkpoints.clear();
        remove_if_exists(&self.path)?;
        info!(path = %self.path.display(), "Checkpoint cache removed");
        Ok(())
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }
}

/// `<file>.tmp` next to `path`
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `content` to `<file>.tmp`, then rename it over `path`
pub(crate) fn write_atomic(path: &Path, content: impl AsRef<[u8]>) -> std::io::Result<()> {
    let tmp_path = temp_path(path);
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const URL: &str = "http://zakupki.gov.ru/epz/order/orderCsvSettings/download.html?fz44=on";

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FingerprintStore::load(dir.path().join("cache.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "").unwrap();
        assert!(FingerprintStore::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_non_object_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            FingerprintStore::load(&path),
            Err(TenderwatchError::Serialization(_))
        ));
    }

    #[test]
    fn test_corrupted_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let good_key = SourceKey::from_url(URL);
        let good_value = fingerprint(b"row");
        let content = serde_json::json!({
            good_key.to_string(): good_value.to_hex(),
            "zz": good_value.to_hex(),
            fingerprint(b"other").to_hex(): "not hex",
            fingerprint(b"third").to_hex(): 42,
        });
        std::fs::write(&path, content.to_string()).unwrap();

        let store = FingerprintStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup(&good_key), Some(good_value));
    }

    #[test]
    fn test_update_replaces_checkpoint() {
        let dir = TempDir::new().unwrap();
        let mut store = FingerprintStore::new(dir.path().join("cache.json"));
        let key = SourceKey::from_url(URL);

        store.update(key, b"first");
        store.update(key, b"second");
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup(&key), Some(fingerprint(b"second")));
    }

    #[test]
    fn test_persist_empty_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{}").unwrap();

        FingerprintStore::new(&path).persist().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_persist_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let mut store = FingerprintStore::new(&path);
        store.update(SourceKey::from_url(URL), b"row");
        store.persist().unwrap();

        assert!(path.exists());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        let path = Path::new("/var/lib/tenderwatch/cache.json");
        assert_eq!(temp_path(path), PathBuf::from("/var/lib/tenderwatch/cache.json.tmp"));
    }

    #[test]
    fn test_persist_ignores_sibling_with_same_stem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let sibling = dir.path().join("cache.tmp");
        std::fs::write(&sibling, "unrelated").unwrap();

        let mut store = FingerprintStore::new(&path);
        store.update(SourceKey::from_url(URL), b"row");
        store.persist().unwrap();

        assert_eq!(std::fs::read_to_string(&sibling).unwrap(), "unrelated");
        assert_eq!(FingerprintStore::load(&path).unwrap(), store);
    }

    #[test]
    fn test_load_persist_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let mut store = FingerprintStore::new(&path);
        for n in 0..5 {
            let url = format!("{}&page={}", URL, n);
            store.update(SourceKey::from_url(&url), format!("row {}", n).as_bytes());
        }
        store.persist().unwrap();

        let loaded = FingerprintStore::load(&path).unwrap();
        assert_eq!(loaded, store);

        loaded.persist().unwrap();
        let reloaded = FingerprintStore::load(&path).unwrap();
        assert_eq!(reloaded, store);
        assert_eq!(reloaded.len(), 5);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let mut store = FingerprintStore::new(&path);
        store.update(SourceKey::from_url(URL), b"row");
        store.persist().unwrap();

        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(!path.exists());
    }
}
