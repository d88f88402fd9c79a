//! CloudWatch Embedded Metric Format emission.
//!
//! Each call writes one JSON document to stdout. Lambda ships stdout to
//! CloudWatch Logs, which extracts the metrics from the `_aws` metadata.
//!
//! See <https://docs.aws.amazon.com/AmazonCloudWatch/latest/monitoring/CloudWatch_Embedded_Metric_Format_Specification.html>.

use std::io::Write;

use relay_core::{RelayMetrics, RelayOutcome};
use serde_json::{json, Value};
use tracing::warn;

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;

pub const OUTCOME_DIMENSION: &str = "Outcome";

pub const WEBHOOK_RECEIVED: &str = "WebhookReceived";
pub const FAILURE_NOTIFIED: &str = "FailureNotified";
pub const EVENT_IGNORED: &str = "EventIgnored";
pub const REQUEST_REJECTED: &str = "RequestRejected";
pub const NOTIFICATION_FAILED: &str = "NotificationFailed";
pub const NOTIFICATION_LATENCY: &str = "NotificationLatency";

/// Metrics recorder writing EMF documents to stdout.
#[derive(Debug, Clone)]
pub struct EmfRelayMetrics {
    namespace: String,
}

impl EmfRelayMetrics {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The EMF document for one request outcome.
    pub fn outcome_document(&self, outcome: &RelayOutcome, timestamp_ms: i64) -> Value {
        let (metric, reason) = match outcome {
            RelayOutcome::Notified(_) => (FAILURE_NOTIFIED, None),
            RelayOutcome::Ignored { .. } => (EVENT_IGNORED, None),
            RelayOutcome::Rejected(reason) => (REQUEST_REJECTED, Some(reason.as_str())),
            RelayOutcome::Failed(reason) => (NOTIFICATION_FAILED, Some(reason.as_str())),
        };

        let mut document = self.document(
            timestamp_ms,
            outcome.status(),
            &[(WEBHOOK_RECEIVED, "Count"), (metric, "Count")],
        );
        document[WEBHOOK_RECEIVED] = json!(1);
        document[metric] = json!(1);
        if let Some(reason) = reason {
            document["Reason"] = json!(reason);
        }
        document
    }

    /// The EMF document for one delivery attempt.
    pub fn delivery_document(&self, duration_ms: u64, success: bool, timestamp_ms: i64) -> Value {
        let outcome = if success { "delivered" } else { "delivery_failed" };
        let mut document = self.document(
            timestamp_ms,
            outcome,
            &[(NOTIFICATION_LATENCY, "Milliseconds")],
        );
        document[NOTIFICATION_LATENCY] = json!(duration_ms);
        document
    }

    fn document(&self, timestamp_ms: i64, outcome: &str, metrics: &[(&str, &str)]) -> Value {
        let definitions: Vec<Value> = metrics
            .iter()
            .map(|(name, unit)| json!({"Name": name, "Unit": unit}))
            .collect();

        json!({
            "_aws": {
                "Timestamp": timestamp_ms,
                "CloudWatchMetrics": [{
                    "Namespace": self.namespace,
                    "Dimensions": [[OUTCOME_DIMENSION]],
                    "Metrics": definitions
                }]
            },
            OUTCOME_DIMENSION: outcome
        })
    }

    fn emit(&self, document: &Value) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", document) {
            warn!(error = %e, "Failed to write metrics document");
        }
    }
}

impl RelayMetrics for EmfRelayMetrics {
    fn record_outcome(&self, outcome: &RelayOutcome) {
        let document = self.outcome_document(outcome, chrono::Utc::now().timestamp_millis());
        self.emit(&document);
    }

    fn record_delivery(&self, duration_ms: u64, success: bool) {
        let document =
            self.delivery_document(duration_ms, success, chrono::Utc::now().timestamp_millis());
        self.emit(&document);
    }
}
