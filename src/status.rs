//! `mirror status`: what the local archive holds.
//!
//! Counts archived documents and lists each space's hierarchy index with its
//! modification time. Reads only the archive root; no remote calls.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::Config;
use crate::local_state;

/// Local archive state, read without contacting the remote.
#[derive(Debug, Clone)]
pub struct ArchiveStatus {
    pub root: PathBuf,
    pub exists: bool,
    pub documents: usize,
    pub hierarchies: Vec<(String, Option<DateTime<Utc>>)>,
}

pub fn archive_status(config: &Config) -> Result<ArchiveStatus> {
    let root = config.archive.root.clone();
    let ext = config.archive.extension.as_str();
    let documents = local_state::scan(&root, ext)?.len();

    let suffix = format!("{}.{}", local_state::HIERARCHY_SUFFIX, ext);
    let mut hierarchies = Vec::new();
    if root.exists() {
        for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(space) = name.strip_suffix(&suffix) {
                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from);
                hierarchies.push((space.to_string(), modified));
            }
        }
    }
    hierarchies.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(ArchiveStatus {
        exists: root.exists(),
        root,
        documents,
        hierarchies,
    })
}

pub fn print_status(config: &Config) -> Result<()> {
    let status = archive_status(config)?;

    println!("archive root: {}", status.root.display());
    if !status.exists {
        println!("  (not created yet; nothing synced)");
        return Ok(());
    }
    println!("  archived documents: {}", status.documents);

    println!("{:<16} UPDATED", "SPACE");
    for (space, modified) in &status.hierarchies {
        let when = modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{:<16} {}", space, when);
    }

    Ok(())
}
