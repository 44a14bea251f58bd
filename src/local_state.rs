//! Recovers what is already archived by reading the archive directory.
//!
//! There is no index file: every run lists the archive root afresh, so a run
//! that was interrupted is picked up by the next one. A document counts as
//! present if a file named `<digits>_<anything>.<ext>` exists; its contents
//! are not compared with the remote. Hierarchy indexes
//! (`<space>_hierarchy.<ext>`) are never documents, even when the space key
//! is all digits.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One archived document found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRecord {
    pub id: String,
    pub path: PathBuf,
}

/// Stem suffix reserved for hierarchy index files.
pub const HIERARCHY_SUFFIX: &str = "_hierarchy";

pub fn is_hierarchy_file_name(name: &str, extension: &str) -> bool {
    name.strip_suffix(extension)
        .and_then(|rest| rest.strip_suffix('.'))
        .map(|stem| stem.ends_with(HIERARCHY_SUFFIX))
        .unwrap_or(false)
}

/// The leading identifier of an archived document file name, if the name
/// follows the `<id>_<title>.<ext>` convention with an all-digit id.
pub fn identifier_from_file_name(name: &str, extension: &str) -> Option<String> {
    let stem = name.strip_suffix(extension)?.strip_suffix('.')?;
    if stem.ends_with(HIERARCHY_SUFFIX) {
        return None;
    }
    let (id, _) = stem.split_once('_')?;
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

/// List archived documents directly under `root`.
///
/// A missing root means nothing has been synced yet and yields no records.
pub fn scan_records(root: &Path, extension: &str) -> Result<Vec<LocalRecord>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("Failed to list archive root {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if let Some(id) = identifier_from_file_name(&name, extension) {
            records.push(LocalRecord {
                id,
                path: entry.path().to_path_buf(),
            });
        }
    }

    records.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(records)
}

/// Archived documents grouped by identifier, read once per run.
///
/// An identifier can map to more than one file when an item was archived
/// under an earlier title by a run that stopped before cleaning up.
#[derive(Debug, Clone, Default)]
pub struct LocalIndex {
    by_id: BTreeMap<String, Vec<PathBuf>>,
}

impl LocalIndex {
    pub fn load(root: &Path, extension: &str) -> Result<Self> {
        let mut by_id: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for record in scan_records(root, extension)? {
            by_id.entry(record.id).or_default().push(record.path);
        }
        Ok(Self { by_id })
    }

    pub fn ids(&self) -> BTreeSet<String> {
        self.by_id.keys().cloned().collect()
    }

    /// Files currently archived for `id`.
    pub fn paths(&self, id: &str) -> &[PathBuf] {
        self.by_id.get(id).map(|p| p.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// The set of identifiers already archived under `root`.
pub fn scan(root: &Path, extension: &str) -> Result<BTreeSet<String>> {
    Ok(LocalIndex::load(root, extension)?.ids())
}
