//! Tests for metrics module.

use super::*;
use relay_core::{
    BranchSource, Classification, FailureReason, FailureRecord, RejectReason,
};

const TIMESTAMP: i64 = 1_700_000_000_000;

fn record() -> FailureRecord {
    FailureRecord {
        classification: Classification::BuildFailed,
        repository: "t/r".to_string(),
        branch: "main".to_string(),
        branch_source: BranchSource::RefName,
        pipeline_or_pr_label: "Pipeline".to_string(),
        triggered_by: "ci-bot".to_string(),
        reason: "Build failed".to_string(),
        link: String::new(),
        commit: None,
    }
}

#[test]
fn test_notified_document_structure() {
    let metrics = EmfRelayMetrics::new("Relay/Test");

    let doc = metrics.outcome_document(&RelayOutcome::Notified(record()), TIMESTAMP);

    assert_eq!(doc["_aws"]["Timestamp"], TIMESTAMP);
    let directive = &doc["_aws"]["CloudWatchMetrics"][0];
    assert_eq!(directive["Namespace"], "Relay/Test");
    assert_eq!(directive["Dimensions"][0][0], "Outcome");
    assert_eq!(directive["Metrics"][0]["Name"], "WebhookReceived");
    assert_eq!(directive["Metrics"][1]["Name"], "FailureNotified");
    assert_eq!(directive["Metrics"][1]["Unit"], "Count");
    assert_eq!(doc["Outcome"], "notified");
    assert_eq!(doc["WebhookReceived"], 1);
    assert_eq!(doc["FailureNotified"], 1);
    assert!(doc.get("Reason").is_none());
}

#[test]
fn test_each_outcome_maps_to_one_metric() {
    let metrics = EmfRelayMetrics::new("Relay/Test");
    let cases = vec![
        (
            RelayOutcome::Ignored {
                event_type: "repo:push".to_string(),
            },
            EVENT_IGNORED,
        ),
        (
            RelayOutcome::Rejected(RejectReason::InvalidSignature),
            REQUEST_REJECTED,
        ),
        (
            RelayOutcome::Failed(FailureReason::NotificationFailed),
            NOTIFICATION_FAILED,
        ),
    ];

    for (outcome, metric) in cases {
        let doc = metrics.outcome_document(&outcome, TIMESTAMP);

        assert_eq!(doc[metric], 1, "{:?}", outcome);
        assert_eq!(doc["Outcome"], outcome.status());
    }
}

#[test]
fn test_rejection_reason_is_a_property() {
    let metrics = EmfRelayMetrics::new("Relay/Test");

    let doc = metrics.outcome_document(&RelayOutcome::Rejected(RejectReason::IpNotAllowed), TIMESTAMP);

    assert_eq!(doc["Reason"], "ip_not_allowed");
    assert_eq!(
        doc["_aws"]["CloudWatchMetrics"][0]["Dimensions"],
        serde_json::json!([["Outcome"]])
    );
}

#[test]
fn test_delivery_document_records_latency() {
    let metrics = EmfRelayMetrics::new("Relay/Test");

    let doc = metrics.delivery_document(125, true, TIMESTAMP);

    assert_eq!(doc["NotificationLatency"], 125);
    assert_eq!(doc["Outcome"], "delivered");
    assert_eq!(
        doc["_aws"]["CloudWatchMetrics"][0]["Metrics"][0]["Unit"],
        "Milliseconds"
    );

    let failed = metrics.delivery_document(10_000, false, TIMESTAMP);
    assert_eq!(failed["Outcome"], "delivery_failed");
}
