//! Monitoring client against a local HTTP server

use chrono::NaiveDate;
use serde_json::json;
use solaredge_data_downloader::cancellation::NeverCancelled;
use solaredge_data_downloader::downloader::RetryPolicy;
use solaredge_data_downloader::fetcher::{ClientConfig, FetcherError, MonitoringClient};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> MonitoringClient {
    let policy = RetryPolicy::default()
        .with_base_delay(Duration::from_millis(20))
        .with_request_timeout(Duration::from_secs(5));
    MonitoringClient::new(
        ClientConfig::new("TEST_KEY")
            .with_base_url(server.uri())
            .with_retry(policy),
    )
}

#[tokio::test]
async fn test_api_key_and_params_sent_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/site/42/alerts.json"))
        .and(query_param("api_key", "TEST_KEY"))
        .and(query_param("startTime", "2024-05-01 00:00:00"))
        .and(query_param("endTime", "2024-05-10 23:59:59"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alerts": { "alert": [
                { "date": "2024-05-03 08:00:00", "severity": "LOW", "alertCode": "A12", "description": "Grid outage" }
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let alerts = client_for(&server)
        .site_alerts(
            "42",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            &NeverCancelled,
        )
        .await
        .unwrap();

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].code.as_deref(), Some("A12"));
    assert_eq!(alerts[0].description.as_deref(), Some("Grid outage"));
}

#[tokio::test]
async fn test_non_json_success_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sites/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .site_page(0, 100, &NeverCancelled)
        .await
        .unwrap_err();

    match err {
        FetcherError::MalformedResponse { endpoint, details } => {
            assert_eq!(endpoint, "/sites/list");
            assert!(details.contains("<html>maintenance"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_forbidden_alerts_carry_hint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/site/42/alerts.json"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "String": { "message": "Forbidden" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .site_alerts(
            "42",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            &NeverCancelled,
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
    let message = err.to_string();
    assert!(message.contains("Forbidden"));
    assert!(message.contains("try less than one month"));
    assert!(!message.contains("TEST_KEY"));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/site/42/overview.json"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "busy" })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/site/42/overview.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "overview": { "lastUpdateTime": "2024-05-01 12:00:00", "currentPower": { "power": 2100.0 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let overview = client_for(&server)
        .site_overview("42", &NeverCancelled)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(overview.current_power, Some(2100.0));
}

#[tokio::test]
async fn test_retry_after_header_from_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sites/list"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "1")
                .set_body_json(json!({ "message": "Too many requests" })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sites": { "count": 1, "site": [{ "id": 7, "name": "Roof" }] }
        })))
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let page = client_for(&server)
        .site_page(0, 100, &NeverCancelled)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(page.sites[0].display_name(), "Roof (7)");
}

/// Sections fail independently; the rest of the details still load
#[tokio::test]
async fn test_site_details_sections_fail_independently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/site/42/overview.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "overview": { "lifeTimeData": { "energy": 1.25e7 } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/site/42/inventory.json"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "String": { "message": "Not found" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/site/42/currentPowerFlow.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "siteCurrentPowerFlow": {
                "unit": "kW",
                "PV": { "status": "Active", "currentPower": 3.4 },
                "GRID": { "status": "Active", "currentPower": 0.6 }
            }
        })))
        .mount(&server)
        .await;

    let details = client_for(&server)
        .site_details("42", &NeverCancelled)
        .await
        .unwrap();

    let overview = details.overview.unwrap().unwrap();
    assert_eq!(overview.lifetime_energy, Some(1.25e7));

    let inventory_error = details.inventory.unwrap_err();
    assert!(inventory_error.contains("404"));
    assert!(inventory_error.contains("Not found"));

    let flow = details.power_flow.unwrap().unwrap();
    assert_eq!(flow.unit.as_deref(), Some("kW"));
    assert_eq!(flow.pv.unwrap().current_power, Some(3.4));
    assert!(flow.storage.is_none());
}
