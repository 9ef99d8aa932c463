//! Maximum span per API request, keyed by data kind and granularity
//!
//! The monitoring API rejects date ranges longer than these limits. Both the
//! chunk planner and the call estimator read from [`CHUNK_LIMITS`] so the
//! numbers can never drift apart.

use crate::{DataKind, Granularity};
use std::num::NonZeroU32;

/// Span used when no table entry matches
pub const DEFAULT_MAX_CHUNK_DAYS: u32 = 28;

/// `(kind, granularity, max days)`; voltage ignores granularity.
pub const CHUNK_LIMITS: &[(DataKind, Option<Granularity>, u32)] = &[
    (DataKind::Voltage, None, 7),
    (DataKind::Production, Some(Granularity::Hour), 28),
    (DataKind::Production, Some(Granularity::Day), 365),
    (DataKind::Production, Some(Granularity::Week), 1095),
    (DataKind::Production, Some(Granularity::Month), 1095),
    (DataKind::Production, None, DEFAULT_MAX_CHUNK_DAYS),
];

/// Maximum number of calendar days a single request may span
pub fn max_chunk_days(kind: DataKind, granularity: Option<Granularity>) -> NonZeroU32 {
    let granularity = match kind {
        DataKind::Voltage => None,
        DataKind::Production => granularity,
    };

    let days = CHUNK_LIMITS
        .iter()
        .find(|(k, g, _)| *k == kind && *g == granularity)
        .map(|(_, _, days)| *days)
        .unwrap_or(DEFAULT_MAX_CHUNK_DAYS);

    NonZeroU32::new(days).unwrap_or(NonZeroU32::MIN)
}
