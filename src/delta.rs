//! Work planning: which remote items still need fetching, and in what order.
//!
//! The plan is shuffled with a fresh per-run random source so that fetches
//! never walk the space in ascending identifier order. Callers must only
//! rely on the set of planned items, never on their order.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, HashSet};

use crate::models::ContentItem;

/// Remote items whose identifier is absent from `local_ids`, shuffled.
///
/// Identifiers are compared as strings. An identifier listed more than once
/// by the remote is planned once.
pub fn plan(remote: &[ContentItem], local_ids: &BTreeSet<String>) -> Vec<ContentItem> {
    plan_with_rng(remote, local_ids, &mut rand::thread_rng())
}

/// Every remote item, shuffled. Used for a full resync.
pub fn plan_full(remote: &[ContentItem]) -> Vec<ContentItem> {
    plan_with_rng(remote, &BTreeSet::new(), &mut rand::thread_rng())
}

pub fn plan_with_rng<R: Rng + ?Sized>(
    remote: &[ContentItem],
    local_ids: &BTreeSet<String>,
    rng: &mut R,
) -> Vec<ContentItem> {
    let mut seen = HashSet::new();
    let mut work: Vec<ContentItem> = remote
        .iter()
        .filter(|item| !local_ids.contains(item.id.as_str()))
        .filter(|item| seen.insert(item.id.clone()))
        .cloned()
        .collect();
    work.shuffle(rng);
    work
}
