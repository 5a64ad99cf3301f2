//! Durable storage for the level mapping
//!
//! A single key holding a JSON object of region id → color name. Storage is a
//! best-effort cache: callers log failures and keep running in memory.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::storage::{APP_DIR, STORAGE_KEY};
use crate::level::LevelColor;
use crate::mapping::StateMapping;

/// Single-key value store surviving across sessions
pub trait DurableStorage {
    /// Stored value, `None` when nothing was saved yet
    fn read(&self) -> Result<Option<String>>;

    fn write(&mut self, value: &str) -> Result<()>;
}

/// Storage backed by one JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File under the platform data directory
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(format!("{STORAGE_KEY}.json"));
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DurableStorage for JsonFileStorage {
    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read levels from {}", self.path.display())),
        }
    }

    fn write(&mut self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create storage directory: {}", parent.display()))?;
        }
        fs::write(&self.path, value)
            .with_context(|| format!("Failed to write levels to {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory storage; `unavailable()` fails every call
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    value: Option<String>,
    unavailable: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            value: None,
            unavailable: true,
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl DurableStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>> {
        if self.unavailable {
            return Err(anyhow::anyhow!("Storage unavailable"));
        }
        Ok(self.value.clone())
    }

    fn write(&mut self, value: &str) -> Result<()> {
        if self.unavailable {
            return Err(anyhow::anyhow!("Storage unavailable"));
        }
        self.value = Some(value.to_string());
        Ok(())
    }
}

pub fn serialize_mapping(mapping: &StateMapping) -> Result<String> {
    serde_json::to_string(mapping).context("Failed to serialize level mapping")
}

/// Parse a stored payload. Entries whose value is not a known color name are
/// dropped; a payload that is not a JSON object is an error.
pub fn parse_mapping(contents: &str) -> Result<StateMapping> {
    let raw: BTreeMap<String, Value> =
        serde_json::from_str(contents).context("Stored levels are not a JSON object")?;

    let mapping = raw
        .into_iter()
        .filter_map(|(region, value)| {
            match value.as_str().and_then(LevelColor::from_storage_name) {
                Some(color) => Some((region, color)),
                None => {
                    warn!(region = %region, value = %value, "Ignoring stored entry with unknown color");
                    None
                }
            }
        })
        .collect::<StateMapping>();

    info!(entries = mapping.len(), "Loaded levels from durable storage");
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping_valid() {
        let mapping = parse_mapping(r#"{"黄浦区":"red","徐汇区":"blue"}"#).unwrap();
        assert_eq!(mapping.get("黄浦区"), LevelColor::Resident);
        assert_eq!(mapping.get("徐汇区"), LevelColor::PassedThrough);
    }

    #[test]
    fn test_parse_mapping_drops_unknown_colors() {
        let mapping = parse_mapping(r#"{"A":"purple","B":3,"C":"green"}"#).unwrap();
        assert_eq!(mapping.get("A"), LevelColor::Unvisited);
        assert!(!mapping.contains("A"));
        assert!(!mapping.contains("B"));
        assert_eq!(mapping.get("C"), LevelColor::StoppedOver);
    }

    #[test]
    fn test_parse_mapping_rejects_non_object() {
        assert!(parse_mapping("not json").is_err());
        assert!(parse_mapping("[1,2]").is_err());
    }

    #[test]
    fn test_serialize_then_parse() {
        let mapping: StateMapping = [("A", LevelColor::Visited), ("B", LevelColor::Unvisited)]
            .into_iter()
            .collect();
        let parsed = parse_mapping(&serialize_mapping(&mapping).unwrap()).unwrap();
        assert_eq!(parsed, mapping);
    }

    #[test]
    fn test_file_storage_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("levels.json"));
        assert_eq!(storage.read().unwrap(), None);
    }

    #[test]
    fn test_file_storage_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonFileStorage::new(dir.path().join("nested/deeper/levels.json"));
        storage.write(r#"{"A":"red"}"#).unwrap();
        assert_eq!(storage.read().unwrap().as_deref(), Some(r#"{"A":"red"}"#));
    }

    #[test]
    fn test_file_storage_write_into_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let mut storage = JsonFileStorage::new(blocker.join("levels.json"));
        assert!(storage.write("{}").is_err());
    }

    #[test]
    fn test_memory_storage_unavailable() {
        let mut storage = MemoryStorage::unavailable();
        assert!(storage.read().is_err());
        assert!(storage.write("{}").is_err());
    }

    #[test]
    fn test_default_path_ends_with_storage_key() {
        let path = JsonFileStorage::default_path();
        assert!(path.ends_with("shanghaiex/shanghaiex-levels.json"));
    }
}
