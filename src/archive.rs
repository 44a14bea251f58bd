//! The on-disk archive: one Markdown file per document plus one hierarchy
//! index per space, all directly under the archive root.
//!
//! ```text
//! scraped_content/
//! ├── ARR_hierarchy.md
//! ├── 10001_Home.md
//! └── 10002_Release_Notes_2024.md
//! ```
//!
//! Every file is written to a dot-prefixed temporary name in the same
//! directory and renamed into place, so an interrupted run never leaves a
//! truncated document that the next scan would count as archived.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::hierarchy::HierarchyDocument;
use crate::local_state;
use crate::models::ContentItem;

/// Reduce a title to characters safe in a file name: alphanumerics, spaces,
/// `-` and `_` survive, trailing whitespace is dropped, spaces become `_`.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim_end()
        .replace(' ', "_")
}

/// Writes documents and hierarchy indexes under one root.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    root: PathBuf,
    extension: String,
}

impl ArchiveWriter {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `<id>_<sanitized title>.<ext>`
    ///
    /// A title that would end the stem in `_hierarchy` gets a trailing `_`,
    /// keeping document names apart from hierarchy index names.
    pub fn document_file_name(&self, item: &ContentItem) -> String {
        let mut title = sanitize_title(item.title_or_default());
        if format!("_{}", title).ends_with(local_state::HIERARCHY_SUFFIX) {
            title.push('_');
        }
        format!("{}_{}.{}", item.id, title, self.extension)
    }

    pub fn hierarchy_path(&self, space_key: &str) -> PathBuf {
        self.root.join(format!(
            "{}{}.{}",
            space_key,
            local_state::HIERARCHY_SUFFIX,
            self.extension
        ))
    }

    /// Write one document: a metadata header, a blank line, then `text`.
    ///
    /// `previous` lists the files archived for this item before the run
    /// (see [`LocalIndex::paths`](local_state::LocalIndex::paths)). Any of
    /// them not replaced in place is removed once the new file is written,
    /// so each identifier maps to one file.
    pub fn write_document(
        &self,
        item: &ContentItem,
        text: &str,
        previous: &[PathBuf],
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create archive root {}", self.root.display())
        })?;

        let path = self.root.join(self.document_file_name(item));
        let contents = format!("{}{}", render_header(item), text);
        write_atomic(&path, contents.as_bytes())?;

        self.remove_superseded(&item.id, previous, &path)?;
        Ok(path)
    }

    /// Replace the hierarchy index for `space_key`.
    pub fn write_hierarchy(&self, space_key: &str, doc: &HierarchyDocument) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create archive root {}", self.root.display())
        })?;

        let path = self.hierarchy_path(space_key);
        write_atomic(&path, doc.render().as_bytes())?;
        Ok(path)
    }

    fn remove_superseded(&self, id: &str, previous: &[PathBuf], keep: &Path) -> Result<()> {
        for stale in previous.iter().filter(|p| p.as_path() != keep) {
            match fs::remove_file(stale) {
                Ok(()) => {
                    tracing::info!(id, path = %stale.display(), "removed file for previous title")
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to remove superseded {}", stale.display())
                    })
                }
            }
        }
        Ok(())
    }
}

fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn render_header(item: &ContentItem) -> String {
    format!(
        "---\nid: {}\ntitle: {}\ntype: {}\nstatus: {}\nposition: {}\n---\n\n",
        item.id,
        header_value(item.title_or_default()),
        header_value(item.content_type.as_deref().unwrap_or("page")),
        header_value(item.status.as_deref().unwrap_or("unknown")),
        item.position_label()
    )
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{}.tmp", name));

    let mut file = fs::File::create(&tmp)
        .with_context(|| format!("Failed to create {}", tmp.display()))?;
    file.write_all(contents)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to flush {}", tmp.display()))?;
    drop(file);

    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}
