//! # Relay Core
//!
//! Core logic for relaying Bitbucket Cloud webhook events to Microsoft Teams.
//!
//! ## Overview
//!
//! For every inbound webhook the relay:
//! 1. Checks the caller against the Bitbucket source IP ranges
//! 2. Verifies the `X-Hub-Signature` HMAC-SHA256 signature
//! 3. Classifies the event as a declined pull request, a failed build, or
//!    neither
//! 4. Delivers a notification for failures through a [`Notifier`]
//!
//! Everything that can go wrong for a single request ends in a
//! [`RelayOutcome`]. Only missing configuration at startup is fatal, and that
//! is handled by the hosting binary.
//!
//! ## Architecture
//!
//! Transport and vendor concerns sit behind traits so the core stays testable:
//! - [`SecretResolver`] for the secret store
//! - [`Notifier`] for the chat webhook
//! - [`BranchResolver`] for the optional repository API lookup
//! - [`RelayMetrics`] for metrics emission
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use relay_core::{
//!     EnvironmentSecretResolver, InboundRequest, Notifier, RelaySecrets, SecretCache,
//!     WebhookRelay, DEFAULT_SECRET_TTL,
//! };
//!
//! # async fn example(notifier: Arc<dyn Notifier>) {
//! let cache = Arc::new(SecretCache::new(
//!     Arc::new(EnvironmentSecretResolver::new()),
//!     DEFAULT_SECRET_TTL,
//! ));
//! let relay = WebhookRelay::new(
//!     cache,
//!     RelaySecrets {
//!         signing_secret: "BITBUCKET_SECRET".to_string(),
//!         teams_webhook_secret: "TEAMS_WEBHOOK_URL".to_string(),
//!     },
//!     notifier,
//! );
//!
//! let outcome = relay.process(&InboundRequest::default()).await;
//! println!("{}: {}", outcome.status(), outcome.message());
//! # }
//! ```

pub mod branch;
pub mod classifier;
pub mod errors;
pub mod ip_gate;
pub mod metrics;
pub mod notifier;
pub mod payload;
pub mod pipeline;
pub mod record;
pub mod request;
pub mod secret_cache;
pub mod secrets;
pub mod signature;

pub use branch::BranchResolver;
pub use classifier::classify;
pub use errors::{
    BranchResolutionError, CidrParseError, EnvelopeError, IpRangesError, NotificationError,
    PayloadError, SecretCacheError, SecretResolutionError, SignatureError,
};
pub use ip_gate::{extract_source_ip, is_allowed, CidrRange, IpDecision, IpGate};
pub use metrics::{NoOpRelayMetrics, RelayMetrics};
pub use notifier::{endpoint_host, DeliveryResult, Notifier};
pub use pipeline::{FailureReason, RejectReason, RelayOutcome, RelaySecrets, WebhookRelay};
pub use record::{BranchSource, Classification, FailureRecord};
pub use request::{InboundRequest, WebhookEnvelope};
pub use secret_cache::{SecretCache, DEFAULT_IP_RANGES_TTL, DEFAULT_SECRET_TTL};
pub use secrets::{EnvironmentSecretResolver, SecretResolver};
pub use signature::{compute_hmac_sha256, validate, validate_signature};
