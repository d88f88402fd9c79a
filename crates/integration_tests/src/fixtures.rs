//! Webhook payloads, secrets and request builders shared by the scenarios.

use async_trait::async_trait;
use lambda_http::aws_lambda_events::apigw::ApiGatewayV2httpRequestContext;
use lambda_http::http::{Method, Request as HttpRequest};
use lambda_http::request::RequestContext;
use lambda_http::{Body, Request, RequestExt};
use relay_core::{compute_hmac_sha256, SecretResolutionError, SecretResolver};
use relay_lambda::RelayConfig;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SIGNING_SECRET_ID: &str = "bitbucket/signing";
pub const TEAMS_SECRET_ID: &str = "teams/webhook";
pub const IP_RANGES_SECRET_ID: &str = "bitbucket/ip-ranges";
pub const API_TOKEN_SECRET_ID: &str = "bitbucket/api-token";

pub const SIGNING_SECRET: &str = "integration-signing-secret";

/// Source address inside the published Bitbucket ranges.
pub const BITBUCKET_SOURCE_IP: &str = "104.192.137.20";

pub const BITBUCKET_IP_RANGES: &str =
    r#"{"ip_ranges": ["104.192.136.0/21", "185.166.140.0/22", "2401:1d80:1000::/36"]}"#;

/// In-memory secret store counting lookups.
#[derive(Default)]
pub struct StaticSecretResolver {
    values: Mutex<HashMap<String, String>>,
    lookups: AtomicUsize,
}

impl StaticSecretResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, secret_ref: &str, value: &str) -> Self {
        self.set(secret_ref, value);
        self
    }

    pub fn set(&self, secret_ref: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(secret_ref.to_string(), value.to_string());
        }
    }

    pub fn remove(&self, secret_ref: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(secret_ref);
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretResolver for StaticSecretResolver {
    async fn resolve_secret(&self, secret_ref: &str) -> Result<String, SecretResolutionError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let values = self.values.lock().map_err(|e| SecretResolutionError::Other {
            message: e.to_string(),
        })?;
        values
            .get(secret_ref)
            .cloned()
            .ok_or_else(|| SecretResolutionError::NotFound {
                reference: secret_ref.to_string(),
            })
    }
}

/// Configuration pointing at the fixture secret identifiers.
pub fn relay_config(extra: &[(&str, &str)]) -> anyhow::Result<RelayConfig> {
    let mut values: HashMap<String, String> = HashMap::new();
    values.insert("BITBUCKET_SECRET_ARN".to_string(), SIGNING_SECRET_ID.to_string());
    values.insert("TEAMS_WEBHOOK_SECRET_ARN".to_string(), TEAMS_SECRET_ID.to_string());
    for (key, value) in extra {
        values.insert(key.to_string(), value.to_string());
    }

    Ok(RelayConfig::from_lookup(|key| values.get(key).cloned())?)
}

/// Scenario A payload: a declined pull request.
pub fn declined_pull_request() -> Value {
    json!({
        "pullrequest": {
            "id": 42,
            "title": "Add X",
            "links": {"html": {"href": "https://x/42"}}
        },
        "repository": {"full_name": "t/r"},
        "actor": {"username": "bob"}
    })
}

/// Commit status payload in `state`, as sent for scenarios B and C.
pub fn commit_status(state: &str) -> Value {
    json!({
        "commit_status": {
            "state": state,
            "description": "3 tests failed",
            "url": "https://ci/1"
        },
        "repository": {"full_name": "t/r"},
        "actor": {"username": "ci-bot"}
    })
}

/// Builder for API Gateway HTTP API webhook requests.
pub struct WebhookRequestBuilder {
    event_type: Option<String>,
    body: String,
    signature: Option<String>,
    source_ip: Option<String>,
    method: Method,
    binary: bool,
}

impl WebhookRequestBuilder {
    /// Request carrying `payload` pretty-printed, signed with the fixture secret.
    pub fn new(event_type: &str, payload: &Value) -> Self {
        let body = serde_json::to_string_pretty(payload).unwrap_or_default();
        let signature = compute_hmac_sha256(body.as_bytes(), SIGNING_SECRET).ok();
        Self {
            event_type: Some(event_type.to_string()),
            body,
            signature,
            source_ip: Some(BITBUCKET_SOURCE_IP.to_string()),
            method: Method::POST,
            binary: false,
        }
    }

    pub fn raw_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Sign the current body with `secret`.
    pub fn signed_with(mut self, secret: &str) -> Self {
        self.signature = compute_hmac_sha256(self.body.as_bytes(), secret).ok();
        self
    }

    /// Sign the current body with the fixture secret.
    pub fn resigned(self) -> Self {
        self.signed_with(SIGNING_SECRET)
    }

    /// Sign a minified rendering of the body while sending the original.
    pub fn signed_minified(mut self) -> Self {
        let minified = serde_json::from_str::<Value>(&self.body)
            .ok()
            .and_then(|v| serde_json::to_string(&v).ok())
            .unwrap_or_default();
        self.signature = compute_hmac_sha256(minified.as_bytes(), SIGNING_SECRET).ok();
        self
    }

    pub fn without_signature(mut self) -> Self {
        self.signature = None;
        self
    }

    pub fn without_event_type(mut self) -> Self {
        self.event_type = None;
        self
    }

    pub fn source_ip(mut self, source_ip: Option<&str>) -> Self {
        self.source_ip = source_ip.map(str::to_string);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Deliver the body as a binary payload.
    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    pub fn build(self) -> anyhow::Result<Request> {
        let mut builder = HttpRequest::builder()
            .method(self.method)
            .uri("https://relay.execute-api.eu-west-1.amazonaws.com/webhook")
            .header("content-type", "application/json");
        if let Some(event_type) = &self.event_type {
            builder = builder.header("X-Event-Key", event_type.as_str());
        }
        if let Some(signature) = &self.signature {
            builder = builder.header("X-Hub-Signature", signature.as_str());
        }

        let body = if self.binary {
            Body::Binary(self.body.into_bytes())
        } else {
            Body::Text(self.body)
        };
        let mut request = builder.body(body)?;

        if let Some(source_ip) = self.source_ip {
            let mut context = ApiGatewayV2httpRequestContext::default();
            context.http.source_ip = Some(source_ip);
            request = request.with_request_context(RequestContext::ApiGatewayV2(context));
        }

        Ok(request)
    }
}
