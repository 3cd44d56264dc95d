//! File-backed key-value settings store.
//!
//! Holds the user-provisioned values that must survive restarts: the master
//! key and an optional service URL override. One JSON object per namespace,
//! written atomically via temp file + rename.

use crate::PdfGateError;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Settings key for the long-lived master key.
pub const KEY_MASTER_KEY: &str = "master_key";

/// Settings key for the service URL override.
pub const KEY_MODAL_URL: &str = "modal_url";

/// File-backed string key-value store.
pub struct SettingsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl SettingsStore {
    /// Open a store at the given path, loading existing values if present.
    pub fn new(path: PathBuf) -> Result<Self, PdfGateError> {
        let values = if path.exists() {
            let json = fs::read_to_string(&path)
                .map_err(|e| PdfGateError::StoreIO(format!("Failed to read settings: {}", e)))?;
            serde_json::from_str(&json)
                .map_err(|e| PdfGateError::StoreIO(format!("Failed to parse settings: {}", e)))?
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    /// Open a store under `dirs::data_dir()/<namespace>/settings.json`.
    pub fn with_namespace(namespace: &str) -> Result<Self, PdfGateError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| PdfGateError::StoreIO("Could not find data directory".to_string()))?;

        let dir = base_dir.join(namespace);
        fs::create_dir_all(&dir)
            .map_err(|e| PdfGateError::StoreIO(format!("Failed to create dir: {}", e)))?;

        Self::new(dir.join("settings.json"))
    }

    /// Look up a value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Set a value and persist.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), PdfGateError> {
        self.values.insert(name.to_string(), value.to_string());
        self.save()
    }

    /// Remove a value and persist. Removing an absent key is not an error.
    pub fn remove(&mut self, name: &str) -> Result<(), PdfGateError> {
        if self.values.remove(name).is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<(), PdfGateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PdfGateError::StoreIO(format!("Failed to create dir: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(&self.values)
            .map_err(|e| PdfGateError::StoreIO(format!("Failed to serialize: {}", e)))?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &json)
            .map_err(|e| PdfGateError::StoreIO(format!("Failed to write temp: {}", e)))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| PdfGateError::StoreIO(format!("Failed to rename: {}", e)))?;

        Ok(())
    }
}
