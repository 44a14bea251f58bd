//! Core data models used throughout the mirror.
//!
//! These types mirror the JSON shapes returned by the remote content API
//! and the per-item results that flow out of the fetch pipeline.

use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Metadata snapshot of one remote content item, as returned by a listing
/// call. Immutable once fetched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub ancestors: Vec<Ancestor>,
    #[serde(default)]
    pub version: Option<Version>,
}

/// One entry in an item's ancestry chain, root first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ancestor {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// Last-modification metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub by: Option<VersionAuthor>,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub number: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionAuthor {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_key: Option<String>,
}

impl VersionAuthor {
    /// Display name, then account name, then raw user key. Empty values are
    /// passed over.
    pub fn preferred_name(&self) -> &str {
        [&self.display_name, &self.username, &self.user_key]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }
}

impl ContentItem {
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }

    /// Sort rank: `None` when the item is unranked (no position, or the
    /// `-1` sentinel). Unranked items order after every ranked one.
    pub fn rank(&self) -> Option<i64> {
        match self.position {
            Some(-1) | None => None,
            Some(p) => Some(p),
        }
    }

    /// The raw position as rendered in archive output.
    pub fn position_label(&self) -> String {
        self.position
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn last_modified(&self) -> &str {
        self.version
            .as_ref()
            .and_then(|v| v.when.as_deref())
            .unwrap_or("")
    }

    pub fn last_author(&self) -> &str {
        self.version
            .as_ref()
            .and_then(|v| v.by.as_ref())
            .map(|by| by.preferred_name())
            .unwrap_or("")
    }
}

/// Full detail for one item, including its markup body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDetail {
    #[serde(flatten)]
    pub item: ContentItem,
    #[serde(default)]
    pub body: Option<DetailBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailBody {
    #[serde(default)]
    pub view: Option<BodyValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BodyValue {
    #[serde(default)]
    pub value: Option<String>,
}

impl ContentDetail {
    /// Extract the markup payload. A missing body field is an empty payload.
    pub fn into_body(self) -> (ContentItem, ContentBody) {
        let markup = self
            .body
            .and_then(|b| b.view)
            .and_then(|v| v.value)
            .unwrap_or_default();
        let body = ContentBody {
            id: self.item.id.clone(),
            markup,
        };
        (self.item, body)
    }
}

/// Raw markup for one item, fetched lazily for planned work only.
#[derive(Debug, Clone)]
pub struct ContentBody {
    pub id: String,
    pub markup: String,
}

/// One page of a listing call.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub size: Option<usize>,
}

impl<T> Listing<T> {
    /// The count compared against the page size. Falls back to the number of
    /// results when the remote omits `size`.
    pub fn returned_count(&self) -> usize {
        self.size.unwrap_or(self.results.len())
    }
}

/// A child reference from the "list children" endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChildRef {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub id: Option<String>,
}

/// An item joined with its independently enumerated children.
///
/// The child list comes from a separate call and is not reconciled with the
/// `ancestors` of other items.
#[derive(Debug, Clone)]
pub struct HierarchyEntry {
    pub item: ContentItem,
    pub children: Vec<String>,
}

/// What happened to one planned work item.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Saved { id: String, path: PathBuf },
    Failed { id: String, reason: String },
    Skipped { id: String, reason: String },
}

impl ItemOutcome {
    pub fn id(&self) -> &str {
        match self {
            ItemOutcome::Saved { id, .. }
            | ItemOutcome::Failed { id, .. }
            | ItemOutcome::Skipped { id, .. } => id,
        }
    }
}

/// Aggregate of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub outcomes: Vec<ItemOutcome>,
}

impl SyncSummary {
    pub fn record(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    /// Items actually attempted, not items intended.
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn saved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Saved { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Failed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Skipped { .. }))
            .count()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {}",
            other
        ))),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) if !s.is_empty() => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}
