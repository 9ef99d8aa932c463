//! Interrupt handling through the operation supervisor
//!
//! The binary wires Ctrl+C to `OperationSupervisor::cancel_current`; these
//! tests drive that call directly.

use crate::support::{client, telemetry_body, ScriptedTransport};
use chrono::NaiveDate;
use solaredge_data_downloader::downloader::{ExportExecutor, RetryPolicy};
use solaredge_data_downloader::operation::{
    OperationError, OperationKind, OperationState, OperationSupervisor,
};
use solaredge_data_downloader::request::{DataSelection, DateRange, RequestDescriptor};
use std::sync::Arc;
use std::time::Duration;

fn request() -> RequestDescriptor {
    RequestDescriptor::new(
        "1234567",
        DateRange::whole_days(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 21).unwrap(),
        )
        .unwrap(),
        DataSelection::voltage("7F123-45"),
    )
    .unwrap()
}

/// Interrupting a running export cancels it and frees the supervisor
#[tokio::test(start_paused = true)]
async fn test_interrupt_cancels_running_export() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .json(200, telemetry_body(&["2024-03-01 10:00:00"]))
            .rate_limited(Some("60")),
    );
    let executor = ExportExecutor::new(client(transport.clone(), RetryPolicy::default()));
    let supervisor = OperationSupervisor::new();

    let guard = supervisor.try_begin(OperationKind::Export).unwrap();
    let task = tokio::spawn({
        let executor = executor.clone();
        async move {
            let result = executor.execute(&request(), guard.token().as_ref()).await;
            drop(guard);
            result
        }
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(supervisor.state(), OperationState::Running(OperationKind::Export));
    assert_eq!(supervisor.cancel_current(), Some(OperationKind::Export));

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    // chunk 1, then the throttled chunk 2; chunk 3 never starts
    assert_eq!(transport.calls(), 2);
    assert_eq!(supervisor.state(), OperationState::Idle);
}

/// A second operation is refused while one is running
#[tokio::test]
async fn test_second_operation_is_busy() {
    let supervisor = OperationSupervisor::new();
    let guard = supervisor.try_begin(OperationKind::Export).unwrap();

    let err = supervisor.try_begin(OperationKind::SiteList).unwrap_err();
    assert_eq!(
        err,
        OperationError::Busy {
            requested: OperationKind::SiteList,
            running: OperationKind::Export,
        }
    );
    assert_eq!(
        err.to_string(),
        "cannot start site list: export operation already in progress"
    );

    drop(guard);
    assert!(supervisor.try_begin(OperationKind::SiteList).is_ok());
}

/// Interrupt with nothing running is a no-op
#[tokio::test]
async fn test_interrupt_when_idle() {
    let supervisor = OperationSupervisor::new();
    assert_eq!(supervisor.cancel_current(), None);
    assert_eq!(supervisor.state(), OperationState::Idle);
}

/// Each operation gets a fresh token; an earlier cancel does not leak
#[tokio::test]
async fn test_new_operation_gets_fresh_token() {
    let supervisor = OperationSupervisor::new();

    let first = supervisor.try_begin(OperationKind::Alerts).unwrap();
    supervisor.cancel_current();
    assert!(!first.token().is_active());
    drop(first);

    let second = supervisor.try_begin(OperationKind::Alerts).unwrap();
    assert!(second.token().is_active());
}
