//! WireMock-based stand-ins for the Teams webhook and the Bitbucket API.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

pub const TEAMS_WEBHOOK_PATH: &str = "/webhookb2/relay-test/IncomingWebhook/token";

/// Teams incoming-webhook mock server.
pub struct TeamsMockServer {
    server: MockServer,
}

impl TeamsMockServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Full webhook URL, as stored in the Teams webhook secret.
    pub fn webhook_url(&self) -> String {
        format!("{}{}", self.server.uri(), TEAMS_WEBHOOK_PATH)
    }

    /// Accept every card, answering like Teams does.
    pub async fn mock_accepts_cards(&self) {
        Mock::given(method("POST"))
            .and(path(TEAMS_WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("1"))
            .mount(&self.server)
            .await;
    }

    /// Reject every card with `status`.
    pub async fn mock_rejects_cards(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(TEAMS_WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string("Webhook message delivery failed"))
            .mount(&self.server)
            .await;
    }

    /// Answer after `delay`.
    pub async fn mock_slow_response(&self, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(TEAMS_WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(200).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Bodies of every card posted so far.
    pub async fn received_cards(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }
}

/// Bitbucket Cloud REST API mock server.
pub struct BitbucketMockServer {
    server: MockServer,
}

impl BitbucketMockServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Answer the branch query for `commit_hash` with `branch`.
    pub async fn mock_branch_for_commit(&self, repository: &str, commit_hash: &str, branch: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/repositories/{}/refs/branches", repository)))
            .and(query_param("q", format!("target.hash=\"{}\"", commit_hash)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pagelen": 10,
                "values": [{"name": branch, "type": "branch"}]
            })))
            .mount(&self.server)
            .await;
    }

    /// Fail every request with `status`.
    pub async fn mock_failure(&self, status: u16) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}
