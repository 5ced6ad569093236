//! The `dataManager` adapter boundary (spec.md §6): named JSON collections
//! durable across restarts. Writers go through an atomic write-then-rename
//! so a crash mid-write never leaves a truncated collection on disk.

use crate::error::AppResult;
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;
use std::collections::HashMap;

pub trait DataManager: Send + Sync {
    fn read_collection<T: DeserializeOwned>(&self, name: &str) -> AppResult<Option<T>>;
    fn write_collection<T: Serialize>(&self, name: &str, value: &T) -> AppResult<()>;
}

/// Production implementation: one JSON file per collection under
/// `WIKI_DATA_DIR`.
pub struct JsonFileDataManager {
    root: PathBuf,
}

impl JsonFileDataManager {
    pub fn new(root: PathBuf) -> AppResult<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

impl DataManager for JsonFileDataManager {
    fn read_collection<T: DeserializeOwned>(&self, name: &str) -> AppResult<Option<T>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write_collection<T: Serialize>(&self, name: &str, value: &T) -> AppResult<()> {
        let target = self.path_for(name);
        let tmp = target.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &target)?;
        Ok(())
    }
}

/// In-memory implementation for tests: avoids touching the filesystem while
/// still exercising the same `DataManager` contract.
#[derive(Default)]
pub struct InMemoryDataManager {
    collections: RwLock<HashMap<String, String>>,
}

impl DataManager for InMemoryDataManager {
    fn read_collection<T: DeserializeOwned>(&self, name: &str) -> AppResult<Option<T>> {
        let guard = self.collections.read().unwrap();
        match guard.get(name) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn write_collection<T: Serialize>(&self, name: &str, value: &T) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.collections.write().unwrap().insert(name.to_string(), json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_file_round_trips_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let dm = JsonFileDataManager::new(dir.path().to_path_buf()).unwrap();
        dm.write_collection("spaces", &vec!["a".to_string(), "b".to_string()]).unwrap();
        let read: Option<Vec<String>> = dm.read_collection("spaces").unwrap();
        assert_eq!(read, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(dir.path().join("spaces.json").exists());
        assert!(!dir.path().join("spaces.json.tmp").exists());
    }

    #[test]
    fn missing_collection_is_none() {
        let dm = InMemoryDataManager::default();
        let read: Option<Vec<String>> = dm.read_collection("nope").unwrap();
        assert_eq!(read, None);
    }
}
