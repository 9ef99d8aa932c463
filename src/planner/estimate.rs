//! Pre-flight call estimation

use super::limits::max_chunk_days;
use crate::request::RequestDescriptor;
use crate::{DataKind, Granularity};
use chrono::NaiveDate;

/// Estimates above this many calls need explicit confirmation
pub const CONFIRMATION_THRESHOLD: u32 = 20;

/// Estimate how many API calls (one per chunk) a date range needs.
///
/// Counts whole calendar days on both ends and divides by the span limit,
/// rounding up. Never returns less than 1, even for inverted dates.
///
/// # Examples
///
/// ```
/// use solaredge_data_downloader::planner::estimate_chunks;
/// use solaredge_data_downloader::{DataKind, Granularity};
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// assert_eq!(estimate_chunks(start, end, DataKind::Production, Some(Granularity::Hour)), 3);
/// ```
pub fn estimate_chunks(
    start_date: NaiveDate,
    end_date: NaiveDate,
    kind: DataKind,
    granularity: Option<Granularity>,
) -> u32 {
    let total_days = (end_date - start_date).num_days() + 1;
    if total_days <= 0 {
        return 1;
    }

    let cap = i64::from(max_chunk_days(kind, granularity).get());
    let chunks = (total_days + cap - 1) / cap;
    u32::try_from(chunks).unwrap_or(u32::MAX).max(1)
}

/// Estimate for a validated request
pub fn estimate_request(request: &RequestDescriptor) -> u32 {
    let range = request.range();
    estimate_chunks(
        range.start().date(),
        range.end().date(),
        request.data_kind(),
        request.granularity(),
    )
}

/// Whether an estimate is large enough to ask the user first
pub fn requires_confirmation(estimated_calls: u32) -> bool {
    estimated_calls > CONFIRMATION_THRESHOLD
}
