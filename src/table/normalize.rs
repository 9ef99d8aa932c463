//! Normalization of raw API payloads into [`MetricTable`]s
//!
//! Both normalizers drop records whose timestamp does not parse, zero-fill
//! missing metrics and sort rows ascending by timestamp.

use crate::fetcher::payload::{MeterEntry, TelemetryRecord};
use crate::table::MetricTable;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Timestamp layouts the monitoring API has been seen to emit
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Field holding the record timestamp in telemetry records
const TELEMETRY_DATE_FIELD: &str = "date";

/// Parse an API timestamp; a bare date means midnight
pub fn parse_api_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(chrono::NaiveTime::MIN))
        })
}

/// Column registry that remembers first-seen order
#[derive(Default)]
struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    fn slot(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        i
    }
}

/// Numeric reading of a scalar: numbers as-is, booleans as 0/1, numeric
/// strings parsed, null as zero. Anything else has no numeric reading.
fn scalar_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Flatten one telemetry field into `(column, value)` pairs.
/// Nested objects become `parent.child` columns.
fn flatten_field(prefix: &str, value: &Value, out: &mut Vec<(String, f64)>) {
    match value {
        Value::Object(map) => flatten_object(Some(prefix), map, out),
        other => {
            if let Some(v) = scalar_value(other) {
                out.push((prefix.to_string(), v));
            }
        }
    }
}

fn flatten_object(prefix: Option<&str>, map: &Map<String, Value>, out: &mut Vec<(String, f64)>) {
    for (key, value) in map {
        let name = match prefix {
            Some(parent) => format!("{parent}.{key}"),
            None => key.clone(),
        };
        flatten_field(&name, value, out);
    }
}

/// Telemetry records to a wide table, one column per metric field.
///
/// Records without a parseable `date` are dropped. Columns appear in the
/// order they are first seen. Rows sharing a timestamp are all kept; the
/// merge step resolves duplicates.
pub fn normalize_telemetry(records: &[TelemetryRecord]) -> MetricTable {
    let mut columns = Columns::default();
    let mut rows = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for record in records {
        let Some(date) = record
            .get(TELEMETRY_DATE_FIELD)
            .and_then(Value::as_str)
            .and_then(parse_api_datetime)
        else {
            dropped += 1;
            continue;
        };

        let mut fields = Vec::new();
        for (key, value) in record {
            if key != TELEMETRY_DATE_FIELD {
                flatten_field(key, value, &mut fields);
            }
        }

        let sparse: HashMap<usize, f64> = fields
            .into_iter()
            .map(|(name, value)| (columns.slot(&name), value))
            .collect();
        rows.push((date, sparse));
    }

    if dropped > 0 {
        debug!(dropped, kept = rows.len(), "telemetry records without a usable date dropped");
    }

    MetricTable::from_sparse(columns.names, rows)
}

/// Meter series to a wide table, one column per meter type.
///
/// Series without a type or without readings are skipped. Within a series
/// the first reading for a timestamp wins. Series are outer-joined on
/// timestamp and gaps are zero-filled.
pub fn normalize_energy(meters: &[MeterEntry]) -> MetricTable {
    let mut columns = Columns::default();
    let mut joined: BTreeMap<NaiveDateTime, HashMap<usize, f64>> = BTreeMap::new();

    for meter in meters {
        let Some(name) = meter
            .meter_type
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            continue;
        };
        let Some(values) = meter.values.as_ref().filter(|values| !values.is_empty()) else {
            continue;
        };

        let column = columns.slot(name);
        for reading in values {
            let Some(date) = reading.date.as_deref().and_then(parse_api_datetime) else {
                continue;
            };
            let value = scalar_value(&reading.value).unwrap_or(0.0);
            joined.entry(date).or_default().entry(column).or_insert(value);
        }
    }

    MetricTable::from_sparse(columns.names, joined)
}
