//! AWS Lambda host for the Bitbucket to Teams relay.
//!
//! Wires the relay from environment configuration: AWS Secrets Manager for
//! secrets, `teams_client` for delivery, `bitbucket_client` for branch lookup
//! and CloudWatch EMF for metrics.

use std::sync::Arc;

use bitbucket_client::{BitbucketBranchResolver, DEFAULT_LOOKUP_TIMEOUT};
use relay_core::{IpGate, RelayMetrics, SecretCache, SecretResolver, WebhookRelay};
use teams_client::TeamsNotifier;
use tracing::{info, warn};

pub mod aws_secrets;
pub mod config;
pub mod handler;
pub mod metrics;

pub use aws_secrets::AwsSecretsManagerResolver;
pub use config::{ConfigurationError, RelayConfig, SecretProvider};
pub use handler::handle;
pub use metrics::EmfRelayMetrics;

/// Build the relay described by `config`.
///
/// The Bitbucket API token, when configured, is read once here. If it cannot
/// be read the relay runs without branch lookup.
///
/// # Errors
/// Returns a [`ConfigurationError`] when a configured value cannot be used to
/// build a client.
pub async fn build_relay(
    config: &RelayConfig,
    resolver: Arc<dyn SecretResolver>,
    metrics: Arc<dyn RelayMetrics>,
) -> Result<WebhookRelay, ConfigurationError> {
    let secrets = Arc::new(SecretCache::new(resolver.clone(), config.secret_ttl));

    let notifier = TeamsNotifier::new(config.notification_timeout).map_err(|e| {
        ConfigurationError::InvalidValue {
            key: config::NOTIFICATION_TIMEOUT_VAR.to_string(),
            reason: e.to_string(),
        }
    })?;

    let mut relay = WebhookRelay::new(secrets.clone(), config.relay_secrets(), Arc::new(notifier))
        .with_metrics(metrics);

    match &config.ip_ranges_secret {
        Some(ranges_secret) => {
            let ranges_cache = Arc::new(SecretCache::new(resolver, config.ip_ranges_ttl));
            relay = relay.with_ip_gate(IpGate::new(ranges_cache, ranges_secret.clone()));
            info!("Source IP allow-listing enabled");
        }
        None => {
            warn!(
                variable = config::IP_RANGES_SECRET_VAR,
                "No IP range secret configured; source IP allow-listing disabled"
            );
        }
    }

    if let Some(token_secret) = &config.api_token_secret {
        match secrets.get(token_secret).await {
            Ok(token) => {
                let resolver = BitbucketBranchResolver::new(
                    &config.api_base_url,
                    Some(token),
                    DEFAULT_LOOKUP_TIMEOUT,
                )
                .map_err(|e| ConfigurationError::InvalidValue {
                    key: config::API_BASE_URL_VAR.to_string(),
                    reason: e.to_string(),
                })?;
                relay = relay.with_branch_resolver(Arc::new(resolver));
                info!(api_base_url = %config.api_base_url, "Branch lookup enabled");
            }
            Err(e) => {
                warn!(error = %e, "Bitbucket API token unavailable; branch lookup disabled");
            }
        }
    }

    Ok(relay)
}
