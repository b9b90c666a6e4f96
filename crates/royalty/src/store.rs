//! Dataset persistence.
//!
//! Whole-record overwrite semantics: `save` replaces the stored dataset in
//! one step, there are no partial-field updates. Serialization of writers is
//! the session lock's job, not the store's.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;
use uuid::Uuid;

use crate::types::Dataset;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait DatasetStore: Send + Sync {
    fn load(&self, id: Uuid) -> Result<Option<Dataset>, StoreError>;
    fn save(&self, dataset: &Dataset) -> Result<(), StoreError>;
    fn list(&self) -> Result<Vec<Dataset>, StoreError>;
}

/// In-memory store (for testing and demos).
#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<Uuid, Dataset>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DatasetStore for InMemoryStore {
    fn load(&self, id: Uuid) -> Result<Option<Dataset>, StoreError> {
        let data = self.data.read().unwrap();
        Ok(data.get(&id).cloned())
    }

    fn save(&self, dataset: &Dataset) -> Result<(), StoreError> {
        let mut data = self.data.write().unwrap();
        data.insert(dataset.id, dataset.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Dataset>, StoreError> {
        let data = self.data.read().unwrap();
        Ok(data.values().cloned().collect())
    }
}

/// File-backed store: all datasets live in one JSON file, rewritten on every
/// save via a temp file + rename so a crash never leaves a torn file.
pub struct JsonFileStore {
    path: PathBuf,
    // Guards the read-modify-write cycle on the backing file.
    file_lock: RwLock<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            file_lock: RwLock::new(()),
        })
    }

    fn read_all(path: &Path) -> Result<Vec<Dataset>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(path: &Path, datasets: &[Dataset]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(datasets)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl DatasetStore for JsonFileStore {
    fn load(&self, id: Uuid) -> Result<Option<Dataset>, StoreError> {
        let _guard = self.file_lock.read().unwrap();
        let all = Self::read_all(&self.path)?;
        Ok(all.into_iter().find(|d| d.id == id))
    }

    fn save(&self, dataset: &Dataset) -> Result<(), StoreError> {
        let _guard = self.file_lock.write().unwrap();
        let mut all = Self::read_all(&self.path)?;
        match all.iter_mut().find(|d| d.id == dataset.id) {
            Some(slot) => *slot = dataset.clone(),
            None => all.push(dataset.clone()),
        }
        Self::write_all(&self.path, &all)
    }

    fn list(&self) -> Result<Vec<Dataset>, StoreError> {
        let _guard = self.file_lock.read().unwrap();
        Self::read_all(&self.path)
    }
}
