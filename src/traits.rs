//! Extension seams for the sync engine.
//!
//! The engine never talks HTTP or parses markup itself. It is driven through
//! two traits:
//!
//! - [`RemoteContentApi`]: the listing and detail calls of the remote store.
//!   [`ConfluenceClient`](crate::connector_confluence::ConfluenceClient) is the
//!   built-in implementation; tests plug in an in-memory one.
//! - [`Transform`]: markup to normalized text.
//!   [`HtmlToMarkdown`](crate::markup::HtmlToMarkdown) is the built-in one.
//!
//! ```text
//! ┌──────────────────┐   ┌───────────┐   ┌──────────────┐
//! │ RemoteContentApi │──▶│  sync.rs  │──▶│ ArchiveWriter│
//! └──────────────────┘   │  pipeline │   └──────────────┘
//!                        └─────┬─────┘
//!                              ▼
//!                         Transform
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ChildRef, ContentDetail, ContentItem, Listing};

/// Failure of a single remote call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// The remote content store.
///
/// Listing calls take a `start` offset and a `limit` page size and return
/// one page. Drive them with [`paginate::enumerate`](crate::paginate::enumerate).
#[async_trait]
pub trait RemoteContentApi: Send + Sync {
    /// List content items in a space.
    async fn list_content(
        &self,
        space_key: &str,
        start: usize,
        limit: usize,
        expand: &str,
    ) -> Result<Listing<ContentItem>, ApiError>;

    /// List the direct children of one item.
    async fn list_children(
        &self,
        id: &str,
        start: usize,
        limit: usize,
    ) -> Result<Listing<ChildRef>, ApiError>;

    /// Fetch one item with its body.
    async fn get_content(&self, id: &str, expand: &str) -> Result<ContentDetail, ApiError>;
}

/// Converts markup into normalized text.
///
/// Implementations must not fail: empty or malformed input yields empty or
/// best-effort output.
pub trait Transform: Send + Sync {
    fn transform(&self, markup: &str) -> String;
}

impl<F> Transform for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn transform(&self, markup: &str) -> String {
        self(markup)
    }
}
