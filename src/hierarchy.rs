//! Hierarchy index of a space.
//!
//! Builds an ordered list of items, each joined with the identifiers of its
//! direct children, and renders it as a Markdown list:
//!
//! ```text
//! # Page Hierarchy
//!
//! - **Home** (ID: 100, Position: 0, Last modified: 2024-01-02T10:00:00.000Z, Author: Jane Doe, Children: [101, 102])
//! ```
//!
//! Child lists come from one "list children" enumeration per item. They are
//! a best-effort cross reference: nothing checks them against the
//! `ancestors` recorded on the children themselves, so a space edited while
//! the index is being built can yield entries that disagree.

use std::cmp::Ordering;

use crate::models::{ContentItem, HierarchyEntry};
use crate::paginate;
use crate::politeness::{DelaySite, PolitenessScheduler};
use crate::traits::RemoteContentApi;

/// The ordered hierarchy of one space.
#[derive(Debug, Clone, Default)]
pub struct HierarchyDocument {
    pub entries: Vec<HierarchyEntry>,
}

impl HierarchyDocument {
    pub fn render(&self) -> String {
        let mut out = String::from("# Page Hierarchy\n\n");
        for entry in &self.entries {
            out.push_str(&render_entry(entry));
            out.push('\n');
        }
        out
    }
}

fn render_entry(entry: &HierarchyEntry) -> String {
    let item = &entry.item;
    format!(
        "- **{}** (ID: {}, Position: {}, Last modified: {}, Author: {}, Children: [{}])",
        item.title_or_default(),
        item.id,
        item.position_label(),
        item.last_modified(),
        item.last_author(),
        entry.children.join(", ")
    )
}

/// Order by position ascending, then title. Unranked items (no position or
/// the `-1` sentinel) go after every ranked item and order among themselves
/// by title.
pub fn hierarchy_order(a: &ContentItem, b: &ContentItem) -> Ordering {
    let key = |item: &ContentItem| (item.rank().is_none(), item.rank().unwrap_or(0));
    key(a).cmp(&key(b)).then_with(|| {
        a.title
            .as_deref()
            .unwrap_or("")
            .cmp(b.title.as_deref().unwrap_or(""))
    })
}

/// Sort `items` and resolve each one's children.
///
/// A failed child enumeration leaves that entry with no children and does
/// not affect the others.
pub async fn build(
    api: &dyn RemoteContentApi,
    items: &[ContentItem],
    page_size: usize,
    scheduler: &PolitenessScheduler,
) -> HierarchyDocument {
    let mut sorted: Vec<&ContentItem> = items.iter().collect();
    sorted.sort_by(|a, b| hierarchy_order(a, b));

    let mut entries = Vec::with_capacity(sorted.len());
    for item in sorted {
        let children = child_ids(api, &item.id, page_size, scheduler).await;
        entries.push(HierarchyEntry {
            item: item.clone(),
            children,
        });
    }

    HierarchyDocument { entries }
}

async fn child_ids(
    api: &dyn RemoteContentApi,
    id: &str,
    page_size: usize,
    scheduler: &PolitenessScheduler,
) -> Vec<String> {
    let listed = paginate::enumerate(
        |start, limit| api.list_children(id, start, limit),
        page_size,
        scheduler,
        DelaySite::Child,
    )
    .await;

    match listed {
        Ok(children) => children.into_iter().filter_map(|c| c.id).collect(),
        Err(e) => {
            tracing::warn!(id, error = %e, "could not list children; recording none");
            Vec::new()
        }
    }
}
