//! Outbound notification abstraction.

use async_trait::async_trait;
use url::Url;

use crate::errors::NotificationError;
use crate::record::FailureRecord;

/// Outcome of a successful notification delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    /// Host of the webhook URL. The full URL embeds a credential and is never logged.
    pub endpoint_host: String,
    pub status_code: u16,
    pub response_time_ms: u64,
}

/// Delivers failure records to a chat channel.
///
/// # Thread Safety
/// Implementations must be Send + Sync; one instance serves every request a
/// warm execution environment handles.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post one notification for `record` to `webhook_url`.
    ///
    /// # Arguments
    /// * `webhook_url` - Incoming-webhook URL of the target channel
    /// * `record` - The failure to report
    ///
    /// # Errors
    /// Returns `NotificationError` when the request cannot be sent, times out,
    /// or the endpoint answers with a non-2xx status. Failed deliveries are
    /// not retried.
    async fn deliver(
        &self,
        webhook_url: &str,
        record: &FailureRecord,
    ) -> Result<DeliveryResult, NotificationError>;
}

/// Host (and explicit port) of a URL for logging, or `"unknown"` when the
/// URL does not parse or has no host.
pub fn endpoint_host(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let host = parsed.host_str()?.to_string();
            Some(match parsed.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host,
            })
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
