//! Where the relay's secrets come from.
//!
//! Every request needs the Bitbucket signing secret and the Teams webhook URL.
//! When configured, the relay also reads the IP allow-list and a Bitbucket API
//! token. The pipeline reaches all of them through a [`SecretCache`] over a
//! [`SecretResolver`].
//!
//! [`SecretCache`]: crate::secret_cache::SecretCache

use async_trait::async_trait;

use crate::errors::SecretResolutionError;

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;

/// Looks up a secret value by identifier.
///
/// Identifiers are whatever the backing store uses: a Secrets Manager ARN in
/// production, an environment variable name locally. The Teams webhook URL is
/// itself a credential, so values never appear in logs or error messages.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Current value of `secret_ref`, trimmed.
    ///
    /// # Errors
    /// `NotFound` when the store has no such secret, `InvalidFormat` when the
    /// value is empty, and the store-specific variants otherwise.
    async fn resolve_secret(&self, secret_ref: &str) -> Result<String, SecretResolutionError>;
}

/// Reads each secret from the environment variable named by its identifier.
///
/// Selected with `SECRET_PROVIDER=env` for local runs, where
/// `BITBUCKET_SECRET_ARN=RELAY_SIGNING_SECRET` makes the relay read the signing
/// secret from `$RELAY_SIGNING_SECRET`.
pub struct EnvironmentSecretResolver;

impl EnvironmentSecretResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnvironmentSecretResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretResolver for EnvironmentSecretResolver {
    async fn resolve_secret(&self, secret_ref: &str) -> Result<String, SecretResolutionError> {
        let value = std::env::var(secret_ref).map_err(|_| SecretResolutionError::NotFound {
            reference: secret_ref.to_string(),
        })?;

        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SecretResolutionError::InvalidFormat {
                reference: secret_ref.to_string(),
                reason: "secret value is empty".to_string(),
            });
        }

        Ok(trimmed.to_string())
    }
}
