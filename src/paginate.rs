//! Offset/limit pagination over any listing call.

use std::future::Future;

use crate::models::Listing;
use crate::politeness::{DelaySite, PolitenessScheduler};
use crate::traits::ApiError;

/// Drain a `start`/`limit` listing call into one vector.
///
/// Starts at offset 0 and keeps requesting pages of `page_size`. A page whose
/// returned count is below `page_size` ends the enumeration; otherwise the
/// offset advances by the returned count and the scheduler pauses at `site`
/// before the next request.
///
/// Any failed page aborts the whole enumeration: items from earlier pages
/// are discarded and the error is returned.
///
/// A `page_size` of zero could never produce a short page, so it yields an
/// empty result without calling `list`.
pub async fn enumerate<T, F, Fut>(
    mut list: F,
    page_size: usize,
    scheduler: &PolitenessScheduler,
    site: DelaySite,
) -> Result<Vec<T>, ApiError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Listing<T>, ApiError>>,
{
    if page_size == 0 {
        tracing::warn!("listing requested with page size 0; nothing fetched");
        return Ok(Vec::new());
    }

    let mut offset = 0usize;
    let mut all = Vec::new();

    loop {
        let page = list(offset, page_size).await?;
        let returned = page.returned_count();
        all.extend(page.results);

        tracing::debug!(start = offset, returned, total = all.len(), "fetched listing page");

        if returned < page_size {
            break;
        }
        offset += returned;
        scheduler.delay(site).await;
    }

    Ok(all)
}
