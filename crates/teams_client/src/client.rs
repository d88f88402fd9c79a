use std::time::Duration;

use async_trait::async_trait;
use relay_core::{endpoint_host, DeliveryResult, FailureRecord, NotificationError, Notifier};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::message::MessageCard;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Default time allowed for one delivery, connection included.
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts failure records to a Teams incoming webhook as MessageCards.
///
/// A single attempt is made per record. Any 2xx response counts as delivered.
#[derive(Debug, Clone)]
pub struct TeamsNotifier {
    client: Client,
    timeout: Duration,
}

impl TeamsNotifier {
    /// Create a notifier whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns `NotificationError::Network` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Network {
                host: "client".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Notifier for TeamsNotifier {
    async fn deliver(
        &self,
        webhook_url: &str,
        record: &FailureRecord,
    ) -> Result<DeliveryResult, NotificationError> {
        let host = endpoint_host(webhook_url);

        let card = MessageCard::from_record(record);
        let body = serde_json::to_vec(&card).map_err(|e| NotificationError::Serialization {
            message: e.to_string(),
        })?;

        debug!(
            endpoint_host = %host,
            classification = %record.classification,
            "Posting Teams notification"
        );

        let started = Instant::now();
        // The webhook URL embeds a credential, so errors are stripped of it.
        let response = self
            .client
            .post(webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Timeout {
                        host: host.clone(),
                        timeout_secs: self.timeout.as_secs(),
                    }
                } else {
                    NotificationError::Network {
                        host: host.clone(),
                        message: e.without_url().to_string(),
                    }
                }
            })?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        let status = response.status();
        if !status.is_success() {
            warn!(
                endpoint_host = %host,
                status_code = status.as_u16(),
                response_time_ms = response_time_ms,
                "Teams webhook rejected notification"
            );
            return Err(NotificationError::HttpStatus {
                host,
                status: status.as_u16(),
            });
        }

        info!(
            endpoint_host = %host,
            status_code = status.as_u16(),
            response_time_ms = response_time_ms,
            "Teams notification delivered"
        );

        Ok(DeliveryResult {
            endpoint_host: host,
            status_code: status.as_u16(),
            response_time_ms,
        })
    }
}
