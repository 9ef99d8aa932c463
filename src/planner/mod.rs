//! Chunk planning
//!
//! Splits a requested [`DateRange`] into contiguous, non-overlapping
//! sub-ranges that each fit inside the API's per-request span limit.
//!
//! Intermediate chunks end at `23:59:59` of their last calendar day and the
//! next chunk starts at midnight of the following day. The final chunk ends at
//! the exact requested end instant, and no chunk ever extends past it.

pub mod estimate;
pub mod limits;

pub use estimate::{estimate_chunks, estimate_request, requires_confirmation, CONFIRMATION_THRESHOLD};
pub use limits::{max_chunk_days, CHUNK_LIMITS};

use crate::cancellation::{CancellationCheck, Cancelled};
use crate::request::DateRange;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::fmt;
use std::num::NonZeroU32;
use tracing::debug;

/// One API-legal sub-range of a request, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// First instant covered
    pub start: NaiveDateTime,
    /// Last instant covered
    pub end: NaiveDateTime,
}

impl Chunk {
    /// Short label used in status messages, e.g. `01/29 00:00-02/25 23:59`
    pub fn label(&self) -> String {
        format!(
            "{}-{}",
            self.start.format("%m/%d %H:%M"),
            self.end.format("%m/%d %H:%M")
        )
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

fn last_second_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Partition `range` into chunks spanning at most `max_days` calendar days.
///
/// Cancellation is checked once per emitted chunk; a cancelled plan returns
/// no partial list.
///
/// # Examples
///
/// ```
/// use solaredge_data_downloader::cancellation::NeverCancelled;
/// use solaredge_data_downloader::planner::plan_chunks;
/// use solaredge_data_downloader::request::DateRange;
/// use chrono::NaiveDate;
/// use std::num::NonZeroU32;
///
/// let range = DateRange::whole_days(
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
/// ).unwrap();
/// let chunks = plan_chunks(range, NonZeroU32::new(3).unwrap(), &NeverCancelled).unwrap();
/// assert_eq!(chunks.len(), 4);
/// assert_eq!(chunks[3].end, range.end());
/// ```
pub fn plan_chunks(
    range: DateRange,
    max_days: NonZeroU32,
    cancel: &dyn CancellationCheck,
) -> Result<Vec<Chunk>, Cancelled> {
    let end = range.end();
    let span = Duration::days(i64::from(max_days.get()) - 1);
    let mut chunks = Vec::new();
    let mut current = range.start();

    loop {
        cancel.check_cancelled()?;

        let ideal_end = current.checked_add_signed(span).unwrap_or(end);
        let mut chunk_end = ideal_end.min(end);

        if chunk_end < end {
            let day = chunk_end.date();
            let end_of_day = day.and_time(last_second_of_day());
            let next_midnight = day.succ_opt().map(|d| d.and_time(NaiveTime::MIN));

            // Rounding up must not overshoot, and must leave room for a next chunk.
            chunk_end = match next_midnight {
                Some(midnight) if end_of_day < end && midnight <= end => end_of_day,
                _ => end,
            };
        }

        chunks.push(Chunk {
            start: current,
            end: chunk_end,
        });

        if chunk_end >= end {
            break;
        }

        current = match chunk_end.date().succ_opt() {
            Some(next_day) => next_day.and_time(NaiveTime::MIN),
            None => break,
        };
    }

    debug!(
        range = %range,
        max_days = max_days.get(),
        chunks = chunks.len(),
        "planned chunks"
    );
    Ok(chunks)
}
