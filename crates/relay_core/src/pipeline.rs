//! Request orchestration
//!
//! [`WebhookRelay`] sequences the gate, signature, classification and
//! notification steps for one inbound request. Every path ends in a
//! [`RelayOutcome`]; nothing is propagated as an error so that the transport
//! layer can always answer.

use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::branch::BranchResolver;
use crate::classifier::classify;
use crate::errors::{EnvelopeError, SignatureError};
use crate::ip_gate::{extract_source_ip, IpDecision, IpGate};
use crate::metrics::{NoOpRelayMetrics, RelayMetrics};
use crate::notifier::Notifier;
use crate::record::{BranchSource, FailureRecord};
use crate::request::{InboundRequest, WebhookEnvelope};
use crate::secret_cache::SecretCache;
use crate::signature::validate_signature;

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;

/// Identifiers of the secrets a relay reads on every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySecrets {
    /// Shared secret Bitbucket signs webhook bodies with
    pub signing_secret: String,
    /// Teams incoming-webhook URL
    pub teams_webhook_secret: String,
}

/// Why a request was turned away without any notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnknownSource,
    IpNotAllowed,
    MalformedRequest,
    InvalidSignature,
    MalformedPayload,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownSource => "unknown_source",
            Self::IpNotAllowed => "ip_not_allowed",
            Self::MalformedRequest => "malformed_request",
            Self::InvalidSignature => "invalid_signature",
            Self::MalformedPayload => "malformed_payload",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the relay could not complete a request it should have handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    SecretUnavailable,
    NotificationFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecretUnavailable => "secret_unavailable",
            Self::NotificationFailed => "notification_failed",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of processing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// A notification was delivered for the record.
    Notified(FailureRecord),
    /// The event was authentic but not a failure.
    Ignored { event_type: String },
    Rejected(RejectReason),
    Failed(FailureReason),
}

impl RelayOutcome {
    /// Short status word, also used as the metrics dimension value.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Notified(_) => "notified",
            Self::Ignored { .. } => "ignored",
            Self::Rejected(_) => "rejected",
            Self::Failed(_) => "failed",
        }
    }

    /// Human-readable detail for the response body.
    pub fn message(&self) -> String {
        match self {
            Self::Notified(record) => format!(
                "{} notification sent for {}",
                record.classification, record.repository
            ),
            Self::Ignored { event_type } => format!("event '{}' is not a failure", event_type),
            Self::Rejected(reason) => format!("request rejected: {}", reason),
            Self::Failed(reason) => format!("request failed: {}", reason),
        }
    }

    /// Whether the sender should see an error status. Only internal failures
    /// qualify; rejections are answered as success so the sender does not retry.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// The Bitbucket to Teams relay.
pub struct WebhookRelay {
    secrets: Arc<SecretCache>,
    config: RelaySecrets,
    notifier: Arc<dyn Notifier>,
    ip_gate: Option<IpGate>,
    branch_resolver: Option<Arc<dyn BranchResolver>>,
    metrics: Arc<dyn RelayMetrics>,
}

impl WebhookRelay {
    /// Create a relay without IP gating, branch lookup or metrics.
    ///
    /// # Arguments
    /// * `secrets` - Cache for the signing secret and the Teams webhook URL
    /// * `config` - Identifiers of those two secrets
    /// * `notifier` - Delivers the notification
    pub fn new(secrets: Arc<SecretCache>, config: RelaySecrets, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            secrets,
            config,
            notifier,
            ip_gate: None,
            branch_resolver: None,
            metrics: Arc::new(NoOpRelayMetrics::new()),
        }
    }

    /// Check callers against an IP allow-list before anything else.
    pub fn with_ip_gate(mut self, gate: IpGate) -> Self {
        self.ip_gate = Some(gate);
        self
    }

    /// Look up branch names for build failures that only carry a commit hash.
    pub fn with_branch_resolver(mut self, resolver: Arc<dyn BranchResolver>) -> Self {
        self.branch_resolver = Some(resolver);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn RelayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Process one inbound request to completion.
    ///
    /// Steps run in order and stop at the first one that decides the outcome:
    /// IP gate, envelope extraction, signing secret lookup, signature check,
    /// JSON parse, classification, branch lookup, delivery.
    #[instrument(skip(self, request))]
    pub async fn process(&self, request: &InboundRequest) -> RelayOutcome {
        let outcome = self.run(request).await;

        match &outcome {
            RelayOutcome::Notified(record) => info!(
                classification = %record.classification,
                repository = %record.repository,
                "Relayed failure notification"
            ),
            RelayOutcome::Ignored { event_type } => {
                info!(event_type = %event_type, "Ignoring non-failure event")
            }
            RelayOutcome::Rejected(reason) => warn!(reason = %reason, "Rejected webhook request"),
            RelayOutcome::Failed(reason) => error!(reason = %reason, "Webhook processing failed"),
        }

        self.metrics.record_outcome(&outcome);
        outcome
    }

    async fn run(&self, request: &InboundRequest) -> RelayOutcome {
        if let Some(gate) = &self.ip_gate {
            let source_ip = extract_source_ip(request);
            match gate.check(source_ip.as_deref()).await {
                IpDecision::UnknownSource => {
                    return RelayOutcome::Rejected(RejectReason::UnknownSource)
                }
                IpDecision::NotAllowed { .. } => {
                    return RelayOutcome::Rejected(RejectReason::IpNotAllowed)
                }
                IpDecision::Allowed | IpDecision::AllowedOnLookupFailure => {}
            }
        }

        let envelope = match WebhookEnvelope::from_request(request) {
            Ok(envelope) => envelope,
            Err(EnvelopeError::MissingSignature { .. }) => {
                warn!(
                    error = %SignatureError::MissingSignature,
                    "Webhook signature verification failed"
                );
                return RelayOutcome::Rejected(RejectReason::InvalidSignature);
            }
            Err(e) => {
                warn!(error = %e, "Malformed webhook request");
                return RelayOutcome::Rejected(RejectReason::MalformedRequest);
            }
        };

        let signing_secret = match self.secrets.get(&self.config.signing_secret).await {
            Ok(secret) => secret,
            Err(e) => {
                error!(error = %e, "Signing secret unavailable");
                return RelayOutcome::Failed(FailureReason::SecretUnavailable);
            }
        };

        if let Err(e) = validate_signature(
            Some(envelope.signature_header()),
            envelope.body(),
            &signing_secret,
        ) {
            warn!(
                event_type = %envelope.event_type(),
                error = %e,
                "Webhook signature verification failed"
            );
            return RelayOutcome::Rejected(RejectReason::InvalidSignature);
        }

        let payload: Value = match serde_json::from_str(envelope.body()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    event_type = %envelope.event_type(),
                    error = %e,
                    "Webhook body is not valid JSON"
                );
                return RelayOutcome::Rejected(RejectReason::MalformedPayload);
            }
        };

        let Some(record) = classify(envelope.event_type(), &payload) else {
            return RelayOutcome::Ignored {
                event_type: envelope.event_type().to_string(),
            };
        };

        let record = self.resolve_branch(record).await;

        let webhook_url = match self.secrets.get(&self.config.teams_webhook_secret).await {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "Teams webhook URL unavailable");
                return RelayOutcome::Failed(FailureReason::SecretUnavailable);
            }
        };

        let started = Instant::now();
        match self.notifier.deliver(&webhook_url, &record).await {
            Ok(result) => {
                self.metrics.record_delivery(result.response_time_ms, true);
                debug!(
                    endpoint_host = %result.endpoint_host,
                    status_code = result.status_code,
                    response_time_ms = result.response_time_ms,
                    "Notification delivered"
                );
                RelayOutcome::Notified(record)
            }
            Err(e) => {
                self.metrics
                    .record_delivery(started.elapsed().as_millis() as u64, false);
                error!(
                    repository = %record.repository,
                    error = %e,
                    "Notification delivery failed"
                );
                RelayOutcome::Failed(FailureReason::NotificationFailed)
            }
        }
    }

    /// Replace a short-hash branch label with the real branch name when a
    /// resolver is configured. Lookup problems keep the record unchanged.
    async fn resolve_branch(&self, record: FailureRecord) -> FailureRecord {
        if record.branch_source != BranchSource::CommitHash {
            return record;
        }
        let (Some(resolver), Some(commit)) = (&self.branch_resolver, record.commit.clone()) else {
            return record;
        };

        match resolver.resolve_branch(&record.repository, &commit).await {
            Ok(Some(branch)) => {
                debug!(repository = %record.repository, branch = %branch, "Resolved branch for commit");
                record.with_resolved_branch(branch)
            }
            Ok(None) => {
                debug!(repository = %record.repository, commit = %commit, "No branch points at commit");
                record
            }
            Err(e) => {
                warn!(
                    repository = %record.repository,
                    commit = %commit,
                    error = %e,
                    "Branch lookup failed; keeping short hash"
                );
                record
            }
        }
    }
}

impl std::fmt::Debug for WebhookRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookRelay")
            .field("config", &self.config)
            .field("ip_gate", &self.ip_gate.is_some())
            .field("branch_resolver", &self.branch_resolver.is_some())
            .finish()
    }
}
