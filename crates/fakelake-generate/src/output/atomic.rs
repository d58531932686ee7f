use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::{GenerationError, StorageError};

/// Serialize `value` as pretty JSON and move it into place in one rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), GenerationError> {
    let data = serde_json::to_vec_pretty(value).map_err(|err| GenerationError::write(path, err))?;
    write_bytes_atomic(path, &data).map_err(|err| GenerationError::write(path, err))
}

pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(path, "tmp");
    if let Err(err) = write_and_rename(&tmp_path, path, data) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            sync_dir(parent)?;
        }
    }

    Ok(())
}

/// Sibling path with `.{suffix}` appended to the file name.
fn write_and_rename(tmp_path: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(tmp_path, path)
}

pub(crate) fn temp_path(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{file_name}.{suffix}"))
}

#[cfg(unix)]
pub(crate) fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(path)?;
    dir.sync_all()
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_lands_without_leftover_temp_file() {
        let dir = std::env::temp_dir().join(format!("fakelake_atomic_{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("value.json");

        write_json_atomic(&path, &serde_json::json!({ "rows": 3 })).expect("write json");

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("parse");
        assert_eq!(value["rows"], 3);
        assert!(!temp_path(&path, "tmp").exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn failed_rename_removes_the_temp_file() {
        let dir = std::env::temp_dir().join(format!("fakelake_atomic_{}", uuid::Uuid::new_v4()));
        let path = dir.join("value.json");
        std::fs::create_dir_all(path.join("occupied")).expect("blocker");

        assert!(write_bytes_atomic(&path, b"{}").is_err());
        assert!(path.is_dir());
        assert!(!temp_path(&path, "tmp").exists());
        let _ = std::fs::remove_dir_all(dir);
    }
}
