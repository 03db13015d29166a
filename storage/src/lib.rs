//! Treasury Storage Layer - File-Based Snapshots
//!
//! The treasury keeps its state in memory and persists it between runs:
//! - each named snapshot is written as JSON (readable) and bincode (fast)
//! - loading prefers bincode and falls back to JSON
//! - writes go to a temporary file first and are renamed into place

use log::debug;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

const JSON_EXT: &str = "json";
const BIN_EXT: &str = "bin";

/// Snapshot directory
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Open storage directory, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data_dir = path.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }
        Ok(Self { data_dir })
    }

    pub fn save_snapshot<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let bin =
            bincode::serialize(data).map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.write_atomic(&self.path(name, JSON_EXT), json.as_bytes())?;
        self.write_atomic(&self.path(name, BIN_EXT), &bin)?;

        debug!(
            "Saved snapshot {} ({} bytes json, {} bytes bin)",
            name,
            json.len(),
            bin.len()
        );
        Ok(())
    }

    /// Load a snapshot (tries bincode first, falls back to JSON)
    pub fn load_snapshot<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let bin_path = self.path(name, BIN_EXT);
        if bin_path.exists() {
            let data = fs::read(&bin_path)?;
            match bincode::deserialize(&data) {
                Ok(value) => return Ok(value),
                Err(e) => debug!("Snapshot {} bincode unreadable ({}), trying JSON", name, e),
            }
        }

        let json_path = self.path(name, JSON_EXT);
        if json_path.exists() {
            let data = fs::read_to_string(&json_path)?;
            return serde_json::from_str(&data)
                .map_err(|e| StorageError::Serialization(e.to_string()));
        }

        Err(StorageError::SnapshotNotFound(name.to_string()))
    }

    pub fn snapshot_exists(&self, name: &str) -> bool {
        self.path(name, BIN_EXT).exists() || self.path(name, JSON_EXT).exists()
    }

    /// Names of all stored snapshots, sorted
    pub fn list_snapshots(&self) -> Result<Vec<String>> {
        let mut snapshots = Vec::new();

        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            let is_snapshot = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == JSON_EXT || ext == BIN_EXT)
                .unwrap_or(false);
            if !is_snapshot {
                continue;
            }

            if let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) {
                if !snapshots.iter().any(|existing| existing == name) {
                    snapshots.push(name.to_string());
                }
            }
        }

        snapshots.sort();
        Ok(snapshots)
    }

    pub fn delete_snapshot(&self, name: &str) -> Result<()> {
        for ext in [BIN_EXT, JSON_EXT] {
            let path = self.path(name, ext);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, name: &str, ext: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", name, ext))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
