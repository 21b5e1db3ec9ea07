//! One-shot requests against a mock server.

use std::ffi::OsString;
use std::time::Duration;

use thermostat_connectors::HttpClient;
use thermostat_domain::HttpMethod;
use thermostatd::adhoc::request_from_args;
use thermostatd::{run_adhoc, AdHocRequest, AdHocRunner, Config, DaemonError, ExitStatus};
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn args(list: &[&str]) -> Vec<OsString> {
    std::iter::once("thermostatd")
        .chain(list.iter().copied())
        .map(OsString::from)
        .collect()
}

fn runner() -> AdHocRunner {
    AdHocRunner::new(HttpClient::new(Duration::from_secs(2)).unwrap())
}

#[tokio::test]
async fn test_post_sends_exactly_one_request_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/programs"))
        .and(body_string("{\"temp\":21}"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/programs", server.uri());
    let request = request_from_args(args(&["--url", &url, "--post", "{\"temp\":21}"]))
        .unwrap()
        .unwrap();
    let response = runner().run(&request).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.body, "created");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_sends_no_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("false"))
        .expect(1)
        .mount(&server)
        .await;

    let request = AdHocRequest {
        method: HttpMethod::Get,
        url: format!("{}/status", server.uri()),
        body: None,
    };
    let response = runner().run(&request).await.unwrap();
    assert_eq!(response.body, "false");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].body.is_empty());
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let request = AdHocRequest {
        method: HttpMethod::Put,
        url: format!("{}/programs/3", server.uri()),
        body: Some("{\"temp\":19}".to_string()),
    };
    let err = runner().run(&request).await.unwrap_err();

    assert!(matches!(err, DaemonError::Http(_)));
    assert_eq!(err.exit_status(), ExitStatus::TransportFailure);
}

#[tokio::test]
async fn test_run_adhoc_exit_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/programs/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/programs/3", server.uri());

    let status = run_adhoc(args(&["-u", &url, "-d", "{\"id\":3}"]), |_: &str| None).await;
    assert_eq!(status, ExitStatus::Success);

    // Rejected before any request is sent
    let status = run_adhoc(args(&["-u", &url, "-d"]), |_: &str| None).await;
    assert_eq!(status, ExitStatus::RequestError);
}

#[tokio::test]
async fn test_daemon_only_settings_do_not_affect_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = |key: &str| match key {
        "THERMOSTAT_POLL_INTERVAL_SECS" => Some("0".to_string()),
        "THERMOSTAT_STATUS_URL" => Some("not-a-url".to_string()),
        _ => None,
    };
    assert!(Config::from_lookup(lookup).is_err());

    let url = format!("{}/status", server.uri());
    let status = run_adhoc(args(&["-u", &url, "-g"]), lookup).await;
    assert_eq!(status, ExitStatus::Success);
}
