//! End-to-end test support for the Bitbucket to Teams relay.
//!
//! Scenarios drive the Lambda handler with API Gateway requests while the
//! Teams webhook and the Bitbucket API are served by WireMock.

pub mod fixtures;
pub mod mock_endpoints;

pub use fixtures::{
    commit_status, declined_pull_request, relay_config, StaticSecretResolver,
    WebhookRequestBuilder,
};
pub use mock_endpoints::{BitbucketMockServer, TeamsMockServer};

/// Initialize logging for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_test_writer()
        .try_init();
}
