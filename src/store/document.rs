//! Whole-document persistence for the registry.
//!
//! The collection lives in one JSON array. Writes go through a temp file in
//! the same directory followed by a rename, so a concurrent reader sees
//! either the previous document or the new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{AppError, Result};
use crate::models::Project;

const EMPTY_DOCUMENT: &[u8] = b"[]";

/// Sidecar file used for the cross-process advisory lock.
pub fn lock_path(document: &Path) -> PathBuf {
    let mut name = document
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "projects.json".into());
    name.push(".lock");
    document.with_file_name(name)
}

/// Materializes an empty collection if nothing is stored yet.
///
/// Never replaces an existing document, even one that appears between the
/// existence check and the rename.
pub fn ensure(document: &Path) -> io::Result<()> {
    if document.exists() {
        return Ok(());
    }
    let dir = parent_dir(document);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(EMPTY_DOCUMENT)?;
    tmp.as_file().sync_all()?;
    match tmp.persist_noclobber(document) {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e.error),
    }
}

/// Reads the full collection. A missing document is an empty collection;
/// an unreadable document, or any record that does not decode, is an error
/// naming the offending record.
pub fn read(document: &Path) -> Result<Vec<Project>> {
    records(document)?
        .into_iter()
        .enumerate()
        .map(|(index, record)| decode(index, record))
        .collect()
}

/// Like [`read`], but records that do not decode are logged and left out.
pub fn read_lenient(document: &Path) -> Result<Vec<Project>> {
    let projects = records(document)?
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match decode(index, record) {
            Ok(project) => Some(project),
            Err(e) => {
                tracing::warn!(path = %document.display(), error = %e, "skipping unreadable project");
                None
            }
        })
        .collect();
    Ok(projects)
}

fn records(document: &Path) -> Result<Vec<Value>> {
    let data = match fs::read(document) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AppError::storage("failed to read projects", e)),
    };
    serde_json::from_slice(&data).map_err(|e| AppError::storage("corrupt projects document", e))
}

fn decode(index: usize, record: Value) -> Result<Project> {
    let id = record
        .get("id")
        .map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "?".to_string());
    serde_json::from_value(record)
        .map_err(|e| AppError::storage(&format!("invalid project #{index} (id {id})"), e))
}

/// Atomically replaces the document with `projects`.
pub fn write(document: &Path, projects: &[Project]) -> Result<()> {
    let data = serde_json::to_vec_pretty(projects)
        .map_err(|e| AppError::storage("failed to serialize projects", e))?;
    fs::create_dir_all(parent_dir(document))?;
    replace(document, &data)?;
    Ok(())
}

fn replace(document: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(document))?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(document).map_err(|e| e.error)?;
    Ok(())
}

fn parent_dir(document: &Path) -> &Path {
    match document.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
