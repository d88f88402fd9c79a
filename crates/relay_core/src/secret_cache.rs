//! Time-based cache in front of a [`SecretResolver`].
//!
//! Warm serverless invocations reuse the process, so secrets fetched by one
//! invocation are served to the next until the entry's TTL runs out. Each
//! cache instance has a single TTL; the relay uses a short one for mutable
//! secrets and a long one for the IP allow-list.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::errors::SecretCacheError;
use crate::secrets::SecretResolver;

#[cfg(test)]
#[path = "secret_cache_tests.rs"]
mod tests;

/// TTL for secrets that may be rotated (signing secret, webhook URL).
pub const DEFAULT_SECRET_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for the IP allow-list, which changes rarely.
pub const DEFAULT_IP_RANGES_TTL: Duration = Duration::from_secs(60 * 60);

/// A secret value together with the moment it was fetched.
#[derive(Debug, Clone)]
pub struct CachedSecret {
    /// Identifier the value was fetched with.
    pub key: String,
    /// The opaque secret payload.
    pub value: String,
    /// When this cache entry was created.
    pub fetched_at: Instant,
}

impl CachedSecret {
    fn new(key: &str, value: String) -> Self {
        Self {
            key: key.to_string(),
            value,
            fetched_at: Instant::now(),
        }
    }

    /// Check if this cache entry is still valid.
    fn is_valid(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Secret cache with a fixed TTL.
///
/// Concurrent misses for the same key may each fetch from the store; the last
/// writer wins and every writer stores a complete entry, so the map is never
/// left half-updated.
///
/// # Examples
///
/// ```no_run
/// use relay_core::secret_cache::{SecretCache, DEFAULT_SECRET_TTL};
/// use relay_core::secrets::EnvironmentSecretResolver;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = SecretCache::new(Arc::new(EnvironmentSecretResolver::new()), DEFAULT_SECRET_TTL);
/// let secret = cache.get("BITBUCKET_WEBHOOK_SECRET").await?;
/// # Ok(())
/// # }
/// ```
pub struct SecretCache {
    resolver: Arc<dyn SecretResolver>,
    entries: RwLock<HashMap<String, CachedSecret>>,
    ttl: Duration,
}

impl SecretCache {
    /// Create a new cache over `resolver` whose entries live for `ttl`.
    pub fn new(resolver: Arc<dyn SecretResolver>, ttl: Duration) -> Self {
        Self {
            resolver,
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// The TTL applied to every entry of this cache.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a secret, fetching it from the store on a miss or after expiry.
    ///
    /// # Errors
    /// Returns [`SecretCacheError::SecretUnavailable`] when the store fails and
    /// there is no unexpired entry for `key`.
    pub async fn get(&self, key: &str) -> Result<String, SecretCacheError> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                if entry.is_valid(self.ttl) {
                    debug!(secret = key, "Secret cache hit");
                    return Ok(entry.value.clone());
                }
            }
        }

        debug!(secret = key, "Secret cache miss, fetching from store");

        let value = self.resolver.resolve_secret(key).await.map_err(|e| {
            error!(secret = key, error = %e, "Failed to retrieve secret");
            SecretCacheError::SecretUnavailable {
                key: key.to_string(),
                source: e,
            }
        })?;

        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CachedSecret::new(key, value.clone()));

        Ok(value)
    }

    /// Drop every cached entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl std::fmt::Debug for SecretCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
