//! Durable backing stores for the resolution cache.

use lattice_props::PrimeProduct;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::resolution::Resolution;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A key-value store the cache hydrates from and writes through to.
pub trait CacheStore: Send + Sync {
    fn load_all(&self) -> Result<Vec<Resolution>, StoreError>;
    fn put(&self, resolution: &Resolution) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<PrimeProduct, Resolution>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<Resolution>, StoreError> {
        Ok(self.entries.lock().values().cloned().collect())
    }

    fn put(&self, resolution: &Resolution) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert(resolution.product, resolution.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// Stores every resolution in one JSON file, rewritten on each put.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Option<BTreeMap<PrimeProduct, Resolution>>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<BTreeMap<PrimeProduct, Resolution>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let list: Vec<Resolution> = serde_json::from_str(&contents)?;
        Ok(list.into_iter().map(|r| (r.product, r)).collect())
    }

    fn write_file(&self, entries: &BTreeMap<PrimeProduct, Resolution>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let list: Vec<&Resolution> = entries.values().collect();
        fs::write(&self.path, serde_json::to_vec_pretty(&list)?)?;
        Ok(())
    }
}

impl CacheStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<Resolution>, StoreError> {
        let mut entries = self.entries.lock();
        let loaded = self.read_file()?;
        let list = loaded.values().cloned().collect();
        *entries = Some(loaded);
        Ok(list)
    }

    fn put(&self, resolution: &Resolution) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        if entries.is_none() {
            *entries = Some(self.read_file()?);
        }
        let Some(map) = entries.as_mut() else {
            return Ok(());
        };
        map.insert(resolution.product, resolution.clone());
        self.write_file(map)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        *entries = Some(BTreeMap::new());
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
