//! Sync orchestration.
//!
//! Coordinates the three operational modes over one [`SyncContext`]:
//!
//! | Mode | Flow |
//! |------|------|
//! | delta (default) | enumerate → hierarchy → scan archive → plan missing → fetch |
//! | full (`--full`) | enumerate → hierarchy → plan everything → fetch |
//! | hierarchy-only | enumerate → hierarchy |
//!
//! All run state lives in the context; nothing is process-global, so
//! several contexts can run one after another in the same process.

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::archive::ArchiveWriter;
use crate::config::Config;
use crate::delta;
use crate::hierarchy;
use crate::local_state::LocalIndex;
use crate::models::{ContentItem, SyncSummary};
use crate::paginate;
use crate::pipeline::ContentPipeline;
use crate::politeness::{DelaySite, PolitenessScheduler};
use crate::progress::{NoProgress, SyncProgressEvent, SyncProgressReporter};
use crate::traits::{RemoteContentApi, Transform};

/// Which items a sync fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Only items with no archived copy.
    Delta,
    /// Every item, regardless of the archive.
    Full,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Plan and report, but fetch and write nothing.
    pub dry_run: bool,
    /// Cap on the number of items fetched, applied after shuffling.
    pub limit: Option<usize>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Delta,
            dry_run: false,
            limit: None,
        }
    }
}

/// Result of one sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub space: String,
    pub mode: SyncMode,
    pub dry_run: bool,
    pub remote: usize,
    pub local: usize,
    pub planned: usize,
    pub hierarchy_path: Option<PathBuf>,
    pub summary: SyncSummary,
}

/// Everything one run needs: configuration, the remote, the transform and
/// where to report progress.
pub struct SyncContext {
    pub config: Config,
    pub api: Box<dyn RemoteContentApi>,
    pub transform: Box<dyn Transform>,
    pub progress: Box<dyn SyncProgressReporter>,
    scheduler: PolitenessScheduler,
    writer: ArchiveWriter,
}

impl SyncContext {
    pub fn new(
        config: Config,
        api: Box<dyn RemoteContentApi>,
        transform: Box<dyn Transform>,
    ) -> Self {
        let scheduler = PolitenessScheduler::new(
            config.politeness.page_bounds(),
            config.politeness.child_bounds(),
            config.politeness.item_bounds(),
        );
        let writer = ArchiveWriter::new(&config.archive.root, &config.archive.extension);
        Self {
            config,
            api,
            transform,
            progress: Box::new(NoProgress),
            scheduler,
            writer,
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn SyncProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn writer(&self) -> &ArchiveWriter {
        &self.writer
    }

    pub fn scheduler(&self) -> &PolitenessScheduler {
        &self.scheduler
    }

    /// List every item in the space.
    ///
    /// A listing failure and an empty space both stop the calling mode: with
    /// no listing there is nothing to plan or index.
    pub async fn enumerate_space(&self, space: &str) -> Result<Vec<ContentItem>> {
        self.progress.report(SyncProgressEvent::Enumerating {
            space: space.to_string(),
        });

        let expand = self.config.listing.content_expand.as_str();
        let listed = paginate::enumerate(
            |start, limit| self.api.list_content(space, start, limit, expand),
            self.config.listing.page_size,
            &self.scheduler,
            DelaySite::Page,
        )
        .await;

        let items = match listed {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(error = %e, "error fetching pages from space '{}'", space);
                bail!("No pages found or error occurred listing space '{}': {}", space, e);
            }
        };
        if items.is_empty() {
            bail!("No pages found in space '{}'", space);
        }

        tracing::info!(total = items.len(), "total pages found in space '{}'", space);
        Ok(items)
    }

    /// Rebuild and rewrite the hierarchy index from an enumeration.
    pub async fn write_hierarchy(&self, space: &str, items: &[ContentItem]) -> Result<PathBuf> {
        let doc = hierarchy::build(
            self.api.as_ref(),
            items,
            self.config.listing.page_size,
            &self.scheduler,
        )
        .await;
        let path = self.writer.write_hierarchy(space, &doc)?;
        tracing::info!(path = %path.display(), "saved page hierarchy");
        Ok(path)
    }

    /// Hierarchy-only refresh.
    pub async fn run_hierarchy(&self, space: &str) -> Result<PathBuf> {
        let items = self.enumerate_space(space).await?;
        self.write_hierarchy(space, &items).await
    }

    /// Delta or full sync of one space.
    pub async fn run_sync(&self, space: &str, options: &SyncOptions) -> Result<SyncReport> {
        tracing::info!(mode = ?options.mode, "starting sync of space '{}'", space);

        let items = self.enumerate_space(space).await?;

        let local = LocalIndex::load(&self.config.archive.root, &self.config.archive.extension)?;

        let mut work = match options.mode {
            SyncMode::Delta => delta::plan(&items, &local.ids()),
            SyncMode::Full => delta::plan_full(&items),
        };
        if let Some(limit) = options.limit {
            work.truncate(limit);
        }
        tracing::info!("{} pages are planned and will be fetched", work.len());

        let mut report = SyncReport {
            space: space.to_string(),
            mode: options.mode,
            dry_run: options.dry_run,
            remote: items.len(),
            local: local.len(),
            planned: work.len(),
            hierarchy_path: None,
            summary: SyncSummary::default(),
        };

        if options.dry_run {
            return Ok(report);
        }

        report.hierarchy_path = Some(self.write_hierarchy(space, &items).await?);

        let pipeline = ContentPipeline {
            api: self.api.as_ref(),
            transform: self.transform.as_ref(),
            writer: &self.writer,
            local: &local,
            scheduler: &self.scheduler,
            progress: self.progress.as_ref(),
            detail_expand: &self.config.listing.detail_expand,
            space,
        };
        report.summary = pipeline.run(&work).await?;

        tracing::info!(
            attempted = report.summary.attempted(),
            saved = report.summary.saved(),
            failed = report.summary.failed(),
            "sync of space '{}' completed",
            space
        );
        Ok(report)
    }
}

/// Print a sync report to stdout.
pub fn print_report(report: &SyncReport) {
    let label = match report.mode {
        SyncMode::Delta => "",
        SyncMode::Full => " (full)",
    };
    if report.dry_run {
        println!("sync {}{} (dry-run)", report.space, label);
        println!("  remote items: {}", report.remote);
        println!("  archived locally: {}", report.local);
        println!("  would fetch: {}", report.planned);
        return;
    }

    println!("sync {}{}", report.space, label);
    println!("  remote items: {}", report.remote);
    println!("  archived locally: {}", report.local);
    println!("  planned: {}", report.planned);
    println!("  attempted: {}", report.summary.attempted());
    println!("  saved: {}", report.summary.saved());
    println!("  failed: {}", report.summary.failed());
    println!("  skipped: {}", report.summary.skipped());
    if let Some(ref path) = report.hierarchy_path {
        println!("  hierarchy: {}", path.display());
    }
    println!("ok");
}
