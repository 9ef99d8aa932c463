//! Chunk planner and call estimator properties

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use solaredge_data_downloader::cancellation::{CancellationToken, Cancelled, NeverCancelled};
use solaredge_data_downloader::planner::{
    estimate_chunks, max_chunk_days, plan_chunks, requires_confirmation, Chunk,
};
use solaredge_data_downloader::request::DateRange;
use solaredge_data_downloader::{DataKind, Granularity};
use std::num::NonZeroU32;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, s).unwrap()
}

fn days(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

fn plan(range: DateRange, max_days: u32) -> Vec<Chunk> {
    plan_chunks(range, days(max_days), &NeverCancelled).unwrap()
}

/// Chunks start at the range start, end at the range end and leave no gap
/// or overlap in between.
fn assert_partition(range: DateRange, chunks: &[Chunk]) {
    assert!(!chunks.is_empty());
    assert_eq!(chunks.first().unwrap().start, range.start());
    assert_eq!(chunks.last().unwrap().end, range.end());

    for chunk in chunks {
        assert!(chunk.start <= chunk.end, "empty chunk {chunk}");
        assert!(chunk.end <= range.end(), "chunk {chunk} overshoots");
    }
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
        assert_eq!(pair[1].start, pair[0].end + Duration::seconds(1));
    }
}

/// No chunk spans more calendar days than the cap
fn assert_within_cap(chunks: &[Chunk], max_days: u32) {
    for chunk in chunks {
        let span = (chunk.end.date() - chunk.start.date()).num_days() + 1;
        assert!(span <= i64::from(max_days), "chunk {chunk} spans {span} days");
    }
}

#[test]
fn test_partition_covers_range_for_many_caps() {
    let range = DateRange::from_dates_and_hours(date(2024, 1, 3), 6, date(2024, 7, 19), 17).unwrap();

    for max_days in [1, 2, 3, 7, 28, 31, 365, 1095] {
        let chunks = plan(range, max_days);
        assert_partition(range, &chunks);
        assert_within_cap(&chunks, max_days);
    }
}

#[test]
fn test_voltage_year_plans_weekly_chunks() {
    let range = DateRange::whole_days(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
    let max_days = max_chunk_days(DataKind::Voltage, None);
    assert_eq!(max_days.get(), 7);

    let chunks = plan_chunks(range, max_days, &NeverCancelled).unwrap();
    // 366 days in 2024
    assert_eq!(chunks.len(), 53);
    assert_eq!(chunks[0].start, at(2024, 1, 1, 0, 0, 0));
    assert_eq!(chunks[0].end, at(2024, 1, 7, 23, 59, 59));
    assert_eq!(chunks[52].start, at(2024, 12, 30, 0, 0, 0));
    assert_eq!(chunks[52].end, at(2024, 12, 31, 23, 59, 59));
}

#[test]
fn test_final_chunk_keeps_exact_end() {
    let range = DateRange::new(at(2024, 3, 1, 0, 0, 0), at(2024, 3, 9, 13, 45, 10)).unwrap();
    let chunks = plan(range, 7);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].end, at(2024, 3, 7, 23, 59, 59));
    assert_eq!(chunks[1].start, at(2024, 3, 8, 0, 0, 0));
    assert_eq!(chunks[1].end, at(2024, 3, 9, 13, 45, 10));
}

#[test]
fn test_range_shorter_than_cap_is_one_chunk() {
    let range = DateRange::new(at(2024, 5, 2, 8, 0, 0), at(2024, 5, 2, 9, 30, 0)).unwrap();
    let chunks = plan(range, 28);

    assert_eq!(chunks, vec![Chunk { start: range.start(), end: range.end() }]);
}

#[test]
fn test_single_instant_range() {
    let instant = at(2024, 5, 2, 12, 0, 0);
    let range = DateRange::new(instant, instant).unwrap();
    let chunks = plan(range, 1);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].start, instant);
    assert_eq!(chunks[0].end, instant);
}

#[test]
fn test_one_day_cap_chunks_each_day() {
    let range = DateRange::whole_days(date(2024, 2, 27), date(2024, 3, 1)).unwrap();
    let chunks = plan(range, 1);

    let starts: Vec<NaiveDate> = chunks.iter().map(|c| c.start.date()).collect();
    assert_eq!(
        starts,
        vec![date(2024, 2, 27), date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]
    );
    assert_partition(range, &chunks);
}

#[test]
fn test_cancelled_plan_returns_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let range = DateRange::whole_days(date(2024, 1, 1), date(2024, 12, 31)).unwrap();

    assert_eq!(plan_chunks(range, days(7), &token), Err(Cancelled));
}

#[test]
fn test_chunk_label() {
    let chunk = Chunk {
        start: at(2024, 1, 29, 0, 0, 0),
        end: at(2024, 2, 25, 23, 59, 59),
    };
    assert_eq!(chunk.label(), "01/29 00:00-02/25 23:59");
}

#[test]
fn test_span_caps() {
    assert_eq!(max_chunk_days(DataKind::Voltage, None).get(), 7);
    assert_eq!(max_chunk_days(DataKind::Production, Some(Granularity::Hour)).get(), 28);
    assert_eq!(max_chunk_days(DataKind::Production, Some(Granularity::Day)).get(), 365);
    assert_eq!(max_chunk_days(DataKind::Production, Some(Granularity::Week)).get(), 1095);
    assert_eq!(max_chunk_days(DataKind::Production, Some(Granularity::Month)).get(), 1095);
    assert_eq!(max_chunk_days(DataKind::Production, None).get(), 28);
}

#[test]
fn test_estimate_matches_whole_day_plan() {
    let cases = [
        (date(2024, 1, 1), date(2024, 1, 1), DataKind::Voltage, None),
        (date(2024, 1, 1), date(2024, 12, 31), DataKind::Voltage, None),
        (date(2023, 6, 15), date(2024, 2, 3), DataKind::Production, Some(Granularity::Hour)),
        (date(2020, 1, 1), date(2024, 12, 31), DataKind::Production, Some(Granularity::Day)),
        (date(2020, 1, 1), date(2024, 12, 31), DataKind::Production, Some(Granularity::Month)),
    ];

    for (start, end, kind, granularity) in cases {
        let range = DateRange::whole_days(start, end).unwrap();
        let chunks = plan_chunks(range, max_chunk_days(kind, granularity), &NeverCancelled).unwrap();
        assert_eq!(
            estimate_chunks(start, end, kind, granularity) as usize,
            chunks.len(),
            "{start}..{end} {kind} {granularity:?}"
        );
    }
}

#[test]
fn test_estimate_is_at_least_one() {
    assert_eq!(
        estimate_chunks(date(2024, 3, 1), date(2024, 2, 1), DataKind::Voltage, None),
        1
    );
}

#[test]
fn test_confirmation_threshold() {
    assert!(!requires_confirmation(20));
    assert!(requires_confirmation(21));
    // a full year of hourly production is 14 calls, no confirmation
    let calls = estimate_chunks(
        date(2024, 1, 1),
        date(2024, 12, 31),
        DataKind::Production,
        Some(Granularity::Hour),
    );
    assert_eq!(calls, 14);
    assert!(!requires_confirmation(calls));
}
