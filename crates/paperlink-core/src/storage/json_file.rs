use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CoreError, Result};

/// Write `items` as an indented JSON array, replacing the file if it exists.
///
/// Non-ASCII text is written as-is (UTF-8), parent directories are created.
pub fn save_json_array<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(items)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a JSON array written by [`save_json_array`]. A missing file is an error.
pub fn load_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(CoreError::FileNotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CoreError::MalformedDump {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Like [`load_json_array`], but `Ok(None)` when the file does not exist.
pub fn load_json_array_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>> {
    if !path.is_file() {
        return Ok(None);
    }
    load_json_array(path).map(Some)
}
