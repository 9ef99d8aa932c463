//! End-to-end exports over a scripted transport

use crate::support::{client, energy_body, fast_policy, telemetry_body, ScriptedTransport};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use solaredge_data_downloader::cancellation::NeverCancelled;
use solaredge_data_downloader::downloader::{CollectingStatusSink, ExportExecutor};
use solaredge_data_downloader::output::{save_table, ExportPathBuilder, FileFormat};
use solaredge_data_downloader::request::{DataSelection, DateRange, RequestDescriptor};
use solaredge_data_downloader::{DataKind, Granularity, MeterKind};
use std::sync::Arc;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn voltage_request(start: NaiveDate, end: NaiveDate) -> RequestDescriptor {
    RequestDescriptor::new(
        "1234567",
        DateRange::whole_days(start, end).unwrap(),
        DataSelection::voltage("7F123-45"),
    )
    .unwrap()
}

/// A 10-day voltage export is fetched as two chunks whose time parameters
/// tile the requested range.
#[tokio::test]
async fn test_voltage_export_requests_each_chunk() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .json(200, telemetry_body(&["2024-03-01 10:00:00", "2024-03-07 12:00:00"]))
            .json(200, telemetry_body(&["2024-03-08 09:00:00"])),
    );
    let executor = ExportExecutor::new(client(transport.clone(), fast_policy()));

    let outcome = executor
        .execute(&voltage_request(date(2024, 3, 1), date(2024, 3, 10)), &NeverCancelled)
        .await
        .unwrap();

    assert_eq!(outcome.chunk_count, 2);
    assert_eq!(outcome.table.len(), 3);
    assert!(outcome.table.is_strictly_ascending());

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].url.ends_with("/equipment/1234567/7F123-45/data.json"));
    assert_eq!(requests[0].param("startTime"), Some("2024-03-01 00:00:00"));
    assert_eq!(requests[0].param("endTime"), Some("2024-03-07 23:59:59"));
    assert_eq!(requests[1].param("startTime"), Some("2024-03-08 00:00:00"));
    assert_eq!(requests[1].param("endTime"), Some("2024-03-10 23:59:59"));
    assert_eq!(requests[1].param("api_key"), Some("TEST_KEY"));
}

/// Rows repeated across chunk boundaries appear once, keeping the first
/// chunk's values.
#[tokio::test]
async fn test_duplicate_rows_across_chunks_keep_first() {
    let first = json!({ "data": { "telemetries": [
        { "date": "2024-03-07 23:55:00", "totalActivePower": 10.0 }
    ]}});
    let second = json!({ "data": { "telemetries": [
        { "date": "2024-03-07 23:55:00", "totalActivePower": 99.0 },
        { "date": "2024-03-08 00:05:00", "totalActivePower": 20.0 }
    ]}});
    let transport = Arc::new(ScriptedTransport::new().json(200, first).json(200, second));
    let executor = ExportExecutor::new(client(transport, fast_policy()));

    let outcome = executor
        .execute(&voltage_request(date(2024, 3, 1), date(2024, 3, 10)), &NeverCancelled)
        .await
        .unwrap();

    let table = outcome.table;
    assert_eq!(table.len(), 2);
    assert_eq!(table.value(at("2024-03-07 23:55:00"), "totalActivePower"), Some(10.0));
    assert_eq!(table.value(at("2024-03-08 00:05:00"), "totalActivePower"), Some(20.0));
}

/// Columns missing from one chunk are zero-filled after the merge
#[tokio::test]
async fn test_columns_union_with_zero_fill() {
    let first = json!({ "data": { "telemetries": [
        { "date": "2024-03-02 10:00:00", "totalActivePower": 10.0 }
    ]}});
    let second = json!({ "data": { "telemetries": [
        { "date": "2024-03-09 10:00:00", "L1Data": { "acVoltage": 231.0 } }
    ]}});
    let transport = Arc::new(ScriptedTransport::new().json(200, first).json(200, second));
    let executor = ExportExecutor::new(client(transport, fast_policy()));

    let table = executor
        .execute(&voltage_request(date(2024, 3, 1), date(2024, 3, 10)), &NeverCancelled)
        .await
        .unwrap()
        .table;

    assert_eq!(table.columns(), ["totalActivePower", "L1Data.acVoltage"]);
    assert_eq!(table.value(at("2024-03-02 10:00:00"), "L1Data.acVoltage"), Some(0.0));
    assert_eq!(table.value(at("2024-03-09 10:00:00"), "totalActivePower"), Some(0.0));
    assert_eq!(table.value(at("2024-03-09 10:00:00"), "L1Data.acVoltage"), Some(231.0));
}

/// Empty chunks are reported once per run of empty chunks
#[tokio::test]
async fn test_no_data_notices() {
    let empty = json!({ "data": { "count": 0, "telemetries": [] } });
    let transport = Arc::new(
        ScriptedTransport::new()
            .json(200, empty.clone())
            .json(200, empty.clone())
            .json(200, telemetry_body(&["2024-03-15 12:00:00"]))
            .json(200, empty),
    );
    let sink = Arc::new(CollectingStatusSink::new());
    let executor =
        ExportExecutor::new(client(transport, fast_policy())).with_status_sink(sink.clone());

    let outcome = executor
        .execute(&voltage_request(date(2024, 3, 1), date(2024, 3, 28)), &NeverCancelled)
        .await
        .unwrap();

    assert_eq!(outcome.chunk_count, 4);
    assert_eq!(outcome.table.len(), 1);
    assert_eq!(
        outcome.notices,
        vec![
            "No data returned for 03/01 00:00-03/07 23:59".to_string(),
            "No data returned for 03/22 00:00-03/28 23:59".to_string(),
        ]
    );
    let messages = sink.messages();
    assert!(messages.contains(&"Fetching export chunk 3/4: 03/15 00:00-03/21 23:59".to_string()));
    assert_eq!(messages.last().unwrap(), "Export finished: 1 rows from 4 chunks");
}

/// Production exports join meters into one column each and pass meters
/// and time unit as query parameters.
#[tokio::test]
async fn test_production_export_joins_meters() {
    let body = energy_body(&[
        (
            "Production",
            &[("2024-01-01 10:00:00", 500.0), ("2024-01-01 11:00:00", 700.0)],
        ),
        ("Consumption", &[("2024-01-01 11:00:00", 300.0)]),
    ]);
    let transport = Arc::new(ScriptedTransport::new().json(200, body));
    let executor = ExportExecutor::new(client(transport.clone(), fast_policy()));
    let request = RequestDescriptor::new(
        "1234567",
        DateRange::whole_days(date(2024, 1, 1), date(2024, 1, 2)).unwrap(),
        DataSelection::production([MeterKind::Consumption, MeterKind::Production], Granularity::Hour),
    )
    .unwrap();

    let table = executor.execute(&request, &NeverCancelled).await.unwrap().table;

    assert_eq!(table.columns(), ["Production", "Consumption"]);
    assert_eq!(table.value(at("2024-01-01 10:00:00"), "Consumption"), Some(0.0));
    assert_eq!(table.value(at("2024-01-01 11:00:00"), "Consumption"), Some(300.0));

    let request = &transport.requests()[0];
    assert!(request.url.ends_with("/site/1234567/energyDetails.json"));
    assert_eq!(request.param("meters"), Some("PRODUCTION,CONSUMPTION"));
    assert_eq!(request.param("timeUnit"), Some("HOUR"));
}

/// A year of daily production fits in one chunk
#[tokio::test]
async fn test_daily_granularity_uses_wide_chunks() {
    let body = energy_body(&[("Production", &[("2024-05-01 00:00:00", 12000.0)])]);
    let transport = Arc::new(ScriptedTransport::new().json(200, body));
    let executor = ExportExecutor::new(client(transport.clone(), fast_policy()));
    let request = RequestDescriptor::new(
        "1234567",
        DateRange::whole_days(date(2024, 1, 1), date(2024, 12, 30)).unwrap(),
        DataSelection::production([MeterKind::Production], Granularity::Day),
    )
    .unwrap();

    let outcome = executor.execute(&request, &NeverCancelled).await.unwrap();

    assert_eq!(outcome.chunk_count, 1);
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.requests()[0].param("timeUnit"), Some("DAY"));
}

/// A failing chunk aborts the export and discards merged rows
#[tokio::test]
async fn test_failed_chunk_aborts_export() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .json(200, telemetry_body(&["2024-03-02 10:00:00"]))
            .json(404, json!({ "String": { "message": "Invalid serial number" } })),
    );
    let executor = ExportExecutor::new(client(transport.clone(), fast_policy()));

    let err = executor
        .execute(&voltage_request(date(2024, 3, 1), date(2024, 3, 21)), &NeverCancelled)
        .await
        .unwrap_err();

    assert!(!err.is_cancelled());
    assert!(err.to_string().contains("Invalid serial number"));
    assert_eq!(transport.calls(), 2);
}

/// Merged table saved to CSV with a date column and one column per metric
#[tokio::test]
async fn test_export_saved_as_csv() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .json(200, telemetry_body(&["2024-03-02 10:00:00"]))
            .json(200, telemetry_body(&["2024-03-09 10:00:00"])),
    );
    let executor = ExportExecutor::new(client(transport, fast_policy()));
    let request = voltage_request(date(2024, 3, 1), date(2024, 3, 10));
    let outcome = executor.execute(&request, &NeverCancelled).await.unwrap();

    let dir = TempDir::new().unwrap();
    let builder = ExportPathBuilder::new(dir.path().join("out"), request.site_id(), DataKind::Voltage)
        .with_dates(date(2024, 3, 1), date(2024, 3, 10))
        .with_format(FileFormat::Csv);
    let saved = save_table(&outcome.table, &builder).unwrap();

    assert_eq!(saved.format, FileFormat::Csv);
    assert!(saved.warning.is_none());

    let content = std::fs::read_to_string(&saved.path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "date,totalActivePower,L1Data.acVoltage,L1Data.acCurrent");
    assert_eq!(lines[1], "2024-03-02 10:00:00,1000,230.5,4");
    assert_eq!(lines[2], "2024-03-09 10:00:00,1000,230.5,4");
}

/// Merged table saved as a single workbook
#[tokio::test]
async fn test_export_saved_as_excel() {
    let transport = Arc::new(
        ScriptedTransport::new().json(200, telemetry_body(&["2024-03-02 10:00:00"])),
    );
    let executor = ExportExecutor::new(client(transport, fast_policy()));
    let request = voltage_request(date(2024, 3, 1), date(2024, 3, 3));
    let outcome = executor.execute(&request, &NeverCancelled).await.unwrap();

    let dir = TempDir::new().unwrap();
    let builder = ExportPathBuilder::new(dir.path(), request.site_id(), DataKind::Voltage)
        .with_dates(date(2024, 3, 1), date(2024, 3, 3))
        .with_format(FileFormat::Excel);
    let saved = save_table(&outcome.table, &builder).unwrap();

    assert_eq!(saved.format, FileFormat::Excel);
    assert!(saved.warning.is_none());
    let written: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(written.len(), 1);
    assert_eq!(saved.path.extension().unwrap(), "xlsx");
}
