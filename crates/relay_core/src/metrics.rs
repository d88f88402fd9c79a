// Metrics recording abstraction for relay observability

use crate::pipeline::RelayOutcome;

/// Abstraction for recording relay metrics.
///
/// # Thread Safety
/// All implementations MUST be thread-safe (Send + Sync).
pub trait RelayMetrics: Send + Sync {
    /// Records the terminal outcome of one inbound request.
    ///
    /// # Arguments
    /// * `outcome` - What the relay did with the request
    fn record_outcome(&self, outcome: &RelayOutcome);

    /// Records one notification delivery attempt.
    ///
    /// # Arguments
    /// * `duration_ms` - Time spent in the delivery call
    /// * `success` - Whether the endpoint accepted the notification
    fn record_delivery(&self, duration_ms: u64, success: bool);
}

/// No-op metrics implementation for testing or when metrics are disabled.
pub struct NoOpRelayMetrics;

impl NoOpRelayMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpRelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayMetrics for NoOpRelayMetrics {
    fn record_outcome(&self, _outcome: &RelayOutcome) {}
    fn record_delivery(&self, _duration_ms: u64, _success: bool) {}
}
