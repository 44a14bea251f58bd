//! Randomized request pacing.
//!
//! Every outbound request after the first in a sequence is preceded by a
//! uniform random pause. There is no parallelism in the mirror; this sleep is
//! the only rate limit.

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Inclusive bounds, in seconds, for one delay draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayBounds {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayBounds {
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Draw a duration uniformly from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min_secs.max(0.0);
        let max = self.max_secs.max(min);
        let secs = if max > min {
            rng.gen_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }
}

/// The named call sites that pause between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelaySite {
    /// Between pages of a space listing.
    Page,
    /// Between pages of a child listing.
    Child,
    /// Between consecutive document fetches.
    Item,
}

impl DelaySite {
    fn index(self) -> usize {
        match self {
            DelaySite::Page => 0,
            DelaySite::Child => 1,
            DelaySite::Item => 2,
        }
    }
}

/// Sleeps for a random duration per call site and counts the pauses taken
/// at each one.
#[derive(Debug)]
pub struct PolitenessScheduler {
    page: DelayBounds,
    child: DelayBounds,
    item: DelayBounds,
    waits: [AtomicU64; 3],
}

impl PolitenessScheduler {
    pub fn new(page: DelayBounds, child: DelayBounds, item: DelayBounds) -> Self {
        Self {
            page,
            child,
            item,
            waits: Default::default(),
        }
    }

    /// A scheduler that never sleeps.
    pub fn disabled() -> Self {
        Self::new(DelayBounds::zero(), DelayBounds::zero(), DelayBounds::zero())
    }

    pub fn bounds(&self, site: DelaySite) -> DelayBounds {
        match site {
            DelaySite::Page => self.page,
            DelaySite::Child => self.child,
            DelaySite::Item => self.item,
        }
    }

    /// Pauses taken at `site` so far, including zero-length ones.
    pub fn waits(&self, site: DelaySite) -> u64 {
        self.waits[site.index()].load(Ordering::Relaxed)
    }

    /// Suspend the calling flow for a random duration within the site's
    /// bounds. Returns the duration waited.
    pub async fn delay(&self, site: DelaySite) -> Duration {
        self.waits[site.index()].fetch_add(1, Ordering::Relaxed);
        let wait = self.bounds(site).sample(&mut rand::thread_rng());
        if !wait.is_zero() {
            tracing::debug!(site = ?site, "waiting {:.2} seconds", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
        wait
    }
}
