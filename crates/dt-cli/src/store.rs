use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use dt_core::{Settings, SettingsError, SettingsPatch, SettingsStore, StoreError};

/// Settings file on disk, in the same JSON shape as the extension storage.
///
/// Every `load` rereads the file. `persist` rereads the raw document and
/// overwrites only the keys present in the patch, so keys written by other
/// tools survive and absent keys stay absent.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Settings, StoreError> {
        read_settings(&self.path)
    }

    fn persist(&self, patch: &SettingsPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut document = read_document(&self.path)?;
        if let Value::Object(changes) = serde_json::to_value(patch).map_err(SettingsError::from)? {
            document.extend(changes);
        }
        write_document(&self.path, &document)
    }
}

pub fn read_settings(path: &Path) -> Result<Settings, StoreError> {
    let json = fs::read_to_string(path)
        .map_err(|e| StoreError::Read(format!("'{}': {}", path.display(), e)))?;
    Ok(Settings::from_json(&json)?)
}

fn read_document(path: &Path) -> Result<Map<String, Value>, StoreError> {
    let json = fs::read_to_string(path)
        .map_err(|e| StoreError::Read(format!("'{}': {}", path.display(), e)))?;
    match serde_json::from_str::<Value>(&json).map_err(SettingsError::from)? {
        Value::Object(document) => Ok(document),
        _ => Err(StoreError::Read(format!("'{}': not a JSON object", path.display()))),
    }
}

fn write_document(path: &Path, document: &Map<String, Value>) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(document).map_err(SettingsError::from)?;
    fs::write(path, json + "\n").map_err(|e| StoreError::Write(format!("'{}': {}", path.display(), e)))
}
