//! Tests for client module.

use super::*;
use relay_core::{BranchSource, Classification};
use serde_json::Value;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn record() -> FailureRecord {
    FailureRecord {
        classification: Classification::BuildFailed,
        repository: "t/r".to_string(),
        branch: "main".to_string(),
        branch_source: BranchSource::RefName,
        pipeline_or_pr_label: "Pipeline".to_string(),
        triggered_by: "ci-bot".to_string(),
        reason: "3 tests failed".to_string(),
        link: "https://ci/1".to_string(),
        commit: None,
    }
}

#[tokio::test]
async fn test_deliver_posts_message_card() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhookb2/abc"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = TeamsNotifier::new(DEFAULT_NOTIFICATION_TIMEOUT).unwrap();
    let url = format!("{}/webhookb2/abc", server.uri());

    // Act
    let result = notifier.deliver(&url, &record()).await.unwrap();

    // Assert
    assert_eq!(result.status_code, 200);
    assert_eq!(result.endpoint_host, endpoint_host(&server.uri()));

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["@type"], "MessageCard");
    assert_eq!(body["title"], "Build failed: t/r");
    assert_eq!(body["potentialAction"][0]["targets"][0]["uri"], "https://ci/1");
}

#[tokio::test]
async fn test_any_2xx_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let notifier = TeamsNotifier::new(DEFAULT_NOTIFICATION_TIMEOUT).unwrap();

    let result = notifier.deliver(&server.uri(), &record()).await.unwrap();

    assert_eq!(result.status_code, 202);
}

#[tokio::test]
async fn test_error_status_is_reported_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bad payload"))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = TeamsNotifier::new(DEFAULT_NOTIFICATION_TIMEOUT).unwrap();

    let result = notifier.deliver(&server.uri(), &record()).await;

    assert!(matches!(
        result,
        Err(NotificationError::HttpStatus { status: 400, .. })
    ));
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let notifier = TeamsNotifier::new(DEFAULT_NOTIFICATION_TIMEOUT).unwrap();

    let result = notifier.deliver(&server.uri(), &record()).await;

    assert!(matches!(
        result,
        Err(NotificationError::HttpStatus { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let notifier = TeamsNotifier::new(Duration::from_millis(200)).unwrap();

    let result = notifier.deliver(&server.uri(), &record()).await;

    assert!(matches!(result, Err(NotificationError::Timeout { .. })));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error_without_url() {
    let notifier = TeamsNotifier::new(DEFAULT_NOTIFICATION_TIMEOUT).unwrap();
    let url = "http://127.0.0.1:1/webhookb2/secret-token";

    let result = notifier.deliver(url, &record()).await;

    match result {
        Err(NotificationError::Network { host, message }) => {
            assert_eq!(host, "127.0.0.1:1");
            assert!(!message.contains("secret-token"));
        }
        other => panic!("expected a network error, got {:?}", other),
    }
}
