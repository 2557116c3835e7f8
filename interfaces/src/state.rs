use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::defs::AccountListEntry;
use crate::defs::Dataset;

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Pretty-prints `value` and atomically replaces `path` with it.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut body = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    body.push('\n');
    write_atomic(path, body.as_bytes())
}

/// Writes into a sibling temp file, then renames it over `path` so readers
/// never observe a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

pub fn load_account_list(path: &Path) -> Result<Vec<AccountListEntry>> {
    if !path.exists() {
        anyhow::bail!("account list not found at {}", path.display());
    }
    load_json(path)
}

pub fn load_account_list_or_default(path: &Path) -> Result<Vec<AccountListEntry>> {
    if path.exists() {
        load_json(path)
    } else {
        Ok(Vec::new())
    }
}

pub fn save_account_list(path: &Path, entries: &[AccountListEntry]) -> Result<()> {
    save_json(path, entries)
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    load_json(path)
}

pub fn save_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    save_json(path, dataset)
}
