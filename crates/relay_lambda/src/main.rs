//! Bitbucket to Teams relay Lambda
//!
//! Build with: cargo lambda build --release --arm64 --bin bootstrap
//!
//! # Environment Variables
//!
//! - `BITBUCKET_SECRET_ARN`: Secret holding the webhook signing secret (required)
//! - `TEAMS_WEBHOOK_SECRET_ARN`: Secret holding the Teams webhook URL (required)
//! - `BITBUCKET_IP_RANGES_SECRET_ARN`: Secret holding the allowed source ranges
//! - `BITBUCKET_API_TOKEN_SECRET_ARN`: Secret holding a Bitbucket API token
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use lambda_http::{run, service_fn, Request};
use relay_core::{EnvironmentSecretResolver, SecretResolver};
use relay_lambda::{
    build_relay, handle, AwsSecretsManagerResolver, EmfRelayMetrics, RelayConfig, SecretProvider,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .with_target(false)
        .without_time() // Lambda adds timestamps
        .init();

    let config = RelayConfig::from_env()?;
    info!(
        secret_provider = ?config.secret_provider,
        metrics_namespace = %config.metrics_namespace,
        "Lambda cold start"
    );

    let resolver: Arc<dyn SecretResolver> = match config.secret_provider {
        SecretProvider::Aws => Arc::new(AwsSecretsManagerResolver::from_env().await),
        SecretProvider::Environment => Arc::new(EnvironmentSecretResolver::new()),
    };
    let metrics = Arc::new(EmfRelayMetrics::new(config.metrics_namespace.clone()));

    let relay = Arc::new(build_relay(&config, resolver, metrics).await?);

    run(service_fn(move |request: Request| {
        let relay = relay.clone();
        async move { handle(request, &relay).await }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
