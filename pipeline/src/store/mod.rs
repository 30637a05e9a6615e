//! Record store port.
//!
//! The pipeline only ever loads a whole collection or replaces a whole
//! collection; there is no partial update. Each record type is kept under
//! its own fixed key.
//!
//! - [`MemoryStore`] - in-memory, for tests and embedding
//! - [`JsonFileStore`] - one JSON file per key in a data directory

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreResult;
use crate::models::{Project, Task};

/// A record type that can be persisted as one JSON array.
pub trait StoredRecord: Serialize + DeserializeOwned + Clone {
    /// Fixed store key for the collection
    const STORE_KEY: &'static str;
    /// Plural noun used in messages
    const KIND: &'static str;
}

impl StoredRecord for Project {
    const STORE_KEY: &'static str = "rdProjects";
    const KIND: &'static str = "projects";
}

impl StoredRecord for Task {
    const STORE_KEY: &'static str = "rdTasks";
    const KIND: &'static str = "tasks";
}

/// Load-whole / replace-whole access to one collection.
pub trait RecordStore<T> {
    /// Load the full collection. A collection never written is empty.
    fn load(&self) -> StoreResult<Vec<T>>;

    /// Load the full collection as raw JSON entries, so entries that no
    /// longer fit `T` can still be inspected.
    fn load_entries(&self) -> StoreResult<Vec<Value>>;

    /// Replace the full collection.
    fn replace(&mut self, records: Vec<T>) -> StoreResult<()>;
}

/// In-memory store for one collection
#[derive(Debug, Clone)]
pub struct MemoryStore<T> {
    records: Vec<T>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn with_records(records: Vec<T>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Serialize> RecordStore<T> for MemoryStore<T> {
    fn load(&self) -> StoreResult<Vec<T>> {
        Ok(self.records.clone())
    }

    fn load_entries(&self) -> StoreResult<Vec<Value>> {
        Ok(self
            .records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?)
    }

    fn replace(&mut self, records: Vec<T>) -> StoreResult<()> {
        self.records = records;
        Ok(())
    }
}

/// Directory-backed store: `<dir>/<STORE_KEY>.json` per collection
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }

    /// Stored blob for `key`, or `None` when it was never written or is blank.
    fn read_blob(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        Ok(Some(content).filter(|c| !c.trim().is_empty()))
    }
}

impl<T: StoredRecord> RecordStore<T> for JsonFileStore {
    fn load(&self) -> StoreResult<Vec<T>> {
        match self.read_blob(T::STORE_KEY)? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(Vec::new()),
        }
    }

    fn load_entries(&self) -> StoreResult<Vec<Value>> {
        match self.read_blob(T::STORE_KEY)? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(Vec::new()),
        }
    }

    fn replace(&mut self, records: Vec<T>) -> StoreResult<()> {
        fs::create_dir_all(&self.data_dir)?;

        // Write beside the target, then rename over it
        let path = self.path_for(T::STORE_KEY);
        let tmp = self.path_for(&format!("{}.tmp", T::STORE_KEY));
        let content = serde_json::to_string_pretty(&records)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
