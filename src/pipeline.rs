//! Fetch, transform and persist planned work, one item at a time.
//!
//! Failures are isolated per item: a detail fetch that fails is recorded
//! and the run moves on to the next item. Only archive write errors end the
//! run early, since continuing would mean losing every later document too.

use anyhow::Result;

use crate::archive::ArchiveWriter;
use crate::local_state::LocalIndex;
use crate::models::{ContentItem, ItemOutcome, SyncSummary};
use crate::politeness::{DelaySite, PolitenessScheduler};
use crate::progress::{SyncProgressEvent, SyncProgressReporter};
use crate::traits::{RemoteContentApi, Transform};

pub struct ContentPipeline<'a> {
    pub api: &'a dyn RemoteContentApi,
    pub transform: &'a dyn Transform,
    pub writer: &'a ArchiveWriter,
    /// Archive contents at the start of the run.
    pub local: &'a LocalIndex,
    pub scheduler: &'a PolitenessScheduler,
    pub progress: &'a dyn SyncProgressReporter,
    pub detail_expand: &'a str,
    pub space: &'a str,
}

impl ContentPipeline<'_> {
    /// Process every work item in order and return what happened to each.
    ///
    /// The scheduler pauses after each saved document unless it was the
    /// last item.
    pub async fn run(&self, work: &[ContentItem]) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();
        let total = work.len();

        for (i, planned) in work.iter().enumerate() {
            tracing::info!(
                "processing {}/{}: {} (ID: {})",
                i + 1,
                total,
                planned.title_or_default(),
                planned.id
            );

            let outcome = self.process(planned).await?;
            let saved = matches!(outcome, ItemOutcome::Saved { .. });
            summary.record(outcome);

            self.progress.report(SyncProgressEvent::Fetching {
                space: self.space.to_string(),
                n: (i + 1) as u64,
                total: total as u64,
            });

            if saved && i + 1 < total {
                self.scheduler.delay(DelaySite::Item).await;
            }
        }

        Ok(summary)
    }

    async fn process(&self, planned: &ContentItem) -> Result<ItemOutcome> {
        let detail = match self.api.get_content(&planned.id, self.detail_expand).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::error!(id = %planned.id, error = %e, "failed to fetch content; skipping");
                return Ok(ItemOutcome::Failed {
                    id: planned.id.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let (fetched, body) = detail.into_body();
        if fetched.id != planned.id {
            tracing::warn!(
                requested = %planned.id,
                returned = %fetched.id,
                "remote returned a different item; skipping"
            );
            return Ok(ItemOutcome::Skipped {
                id: planned.id.clone(),
                reason: format!("remote returned item {}", fetched.id),
            });
        }

        let item = merge_metadata(fetched, planned);
        let text = self.transform.transform(&body.markup);
        let path = self
            .writer
            .write_document(&item, &text, self.local.paths(&item.id))?;

        tracing::info!(id = %item.id, path = %path.display(), "saved document");
        Ok(ItemOutcome::Saved { id: item.id, path })
    }
}

/// Detail fields win; anything the detail call left out comes from the
/// listing snapshot.
fn merge_metadata(mut fetched: ContentItem, listed: &ContentItem) -> ContentItem {
    if fetched.title.is_none() {
        fetched.title = listed.title.clone();
    }
    if fetched.content_type.is_none() {
        fetched.content_type = listed.content_type.clone();
    }
    if fetched.status.is_none() {
        fetched.status = listed.status.clone();
    }
    if fetched.position.is_none() {
        fetched.position = listed.position;
    }
    if fetched.version.is_none() {
        fetched.version = listed.version.clone();
    }
    if fetched.ancestors.is_empty() {
        fetched.ancestors = listed.ancestors.clone();
    }
    fetched
}
