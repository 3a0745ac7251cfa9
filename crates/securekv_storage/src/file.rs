//! File-based preferences backend for persistent storage.

use crate::backend::{PreferencesBackend, PreferencesProvider};
use crate::error::{StorageError, StorageResult};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A preferences store persisted as a single JSON object.
///
/// Every mutation rewrites the whole document: the new contents are written
/// to a sibling temporary file, synced, and renamed over the old one, so a
/// crash leaves either the previous or the new document on disk.
///
/// # Example
///
/// ```no_run
/// use securekv_storage::{FilePreferences, PreferencesBackend};
/// use std::path::Path;
///
/// let prefs = FilePreferences::open("settings", Path::new("settings.json")).unwrap();
/// prefs.put("theme", "dark").unwrap();
/// ```
#[derive(Debug)]
pub struct FilePreferences {
    name: String,
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FilePreferences {
    /// Opens the store at `path`, creating an empty one if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] if the file exists but is not a
    /// JSON object of strings, or an I/O error if it cannot be read.
    pub fn open(name: impl Into<String>, path: &Path) -> StorageResult<Self> {
        let name = name.into();
        let entries = if path.exists() {
            let raw = fs::read(path)?;
            if raw.is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_slice(&raw)
                    .map_err(|e| StorageError::corrupted(&name, e.to_string()))?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            name,
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let document = serde_json::to_vec_pretty(entries)?;
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&document)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn mutate<F>(&self, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        f(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

impl PreferencesBackend for FilePreferences {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        if !self.entries.read().contains_key(key) {
            return Ok(());
        }
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> StorageResult<()> {
        self.mutate(BTreeMap::clear)
    }

    fn all(&self) -> StorageResult<BTreeMap<String, String>> {
        Ok(self.entries.read().clone())
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.entries.read().contains_key(key))
    }
}

/// Opens [`FilePreferences`] stores as `<dir>/<name>.json`.
#[derive(Debug)]
pub struct FileProvider {
    dir: PathBuf,
    stores: Mutex<HashMap<String, Arc<FilePreferences>>>,
}

impl FileProvider {
    /// Creates a provider rooted at `dir`. The directory is created lazily.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the file path used for the store called `name`.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl PreferencesProvider for FileProvider {
    fn open(&self, name: &str) -> StorageResult<Arc<dyn PreferencesBackend>> {
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(name) {
            return Ok(Arc::clone(store) as Arc<dyn PreferencesBackend>);
        }
        let store = Arc::new(FilePreferences::open(name, &self.path_for(name))?);
        stores.insert(name.to_string(), Arc::clone(&store));
        Ok(store)
    }

    fn destroy(&self, name: &str) -> StorageResult<()> {
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(name) {
            return store.clear();
        }
        let path = self.path_for(name);
        if path.exists() {
            tracing::warn!(
                store = name,
                path = %path.display(),
                "removing unreadable preferences file"
            );
            fs::remove_file(&path)?;
        }
        stores.remove(name);
        Ok(())
    }
}
