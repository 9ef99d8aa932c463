//! Site list pagination
//!
//! `/sites/list` returns at most [`SITE_PAGE_SIZE`] sites per call. Pages are
//! requested by `startIndex` until the reported count is reached, a page comes
//! back empty or short, or [`MAX_PAGES`] is hit.

use crate::cancellation::{cancellable_sleep, CancellationCheck};
use crate::downloader::config::{SITE_PAGE_PAUSE, SITE_PAGE_SIZE};
use crate::fetcher::payload::SiteSummary;
use crate::fetcher::{FetcherResult, MonitoringClient};
use tracing::debug;

/// Upper bound on pages fetched, against a server that never stops paging
const MAX_PAGES: usize = 10_000;

/// Every site visible to the API key, sorted by display name
pub async fn list_all_sites(
    client: &MonitoringClient,
    cancel: &dyn CancellationCheck,
) -> FetcherResult<Vec<SiteSummary>> {
    let mut sites: Vec<SiteSummary> = Vec::new();
    let mut expected_total: Option<u64> = None;
    let mut start_index: u32 = 0;

    for page_number in 1..=MAX_PAGES {
        cancel.check_cancelled()?;

        let page = client.site_page(start_index, SITE_PAGE_SIZE, cancel).await?;
        if expected_total.is_none() {
            expected_total = page.count;
        }

        let page_len = page.sites.len();
        sites.extend(page.sites);

        let total_display = expected_total
            .filter(|total| *total > 0)
            .map_or_else(|| "many".to_string(), |total| total.to_string());
        client
            .status_sink()
            .status(&format!("Fetched {}/{} sites...", sites.len(), total_display));
        if let Some(total) = expected_total.filter(|total| *total > 0) {
            client
                .status_sink()
                .progress((sites.len() as f64 / total as f64).min(0.95));
        }

        debug!(page = page_number, sites = page_len, start_index, "site page fetched");

        let reached_total = expected_total.map_or(true, |total| sites.len() as u64 >= total);
        if reached_total || page_len == 0 || page_len < SITE_PAGE_SIZE as usize {
            break;
        }

        start_index = start_index.saturating_add(page_len as u32);
        cancellable_sleep(SITE_PAGE_PAUSE, cancel).await?;
    }

    sites.sort_by_key(SiteSummary::display_name);
    Ok(sites)
}
