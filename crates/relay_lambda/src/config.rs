//! Startup configuration read from the Lambda environment.

use std::time::Duration;

use relay_core::{RelaySecrets, DEFAULT_IP_RANGES_TTL, DEFAULT_SECRET_TTL};
use teams_client::DEFAULT_NOTIFICATION_TIMEOUT;
use thiserror::Error;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

pub const SIGNING_SECRET_VAR: &str = "BITBUCKET_SECRET_ARN";
pub const TEAMS_WEBHOOK_SECRET_VAR: &str = "TEAMS_WEBHOOK_SECRET_ARN";
pub const IP_RANGES_SECRET_VAR: &str = "BITBUCKET_IP_RANGES_SECRET_ARN";
pub const API_TOKEN_SECRET_VAR: &str = "BITBUCKET_API_TOKEN_SECRET_ARN";
pub const SECRET_CACHE_TTL_VAR: &str = "SECRET_CACHE_TTL_SECS";
pub const IP_RANGES_CACHE_TTL_VAR: &str = "IP_RANGES_CACHE_TTL_SECS";
pub const NOTIFICATION_TIMEOUT_VAR: &str = "NOTIFICATION_TIMEOUT_SECS";
pub const METRICS_NAMESPACE_VAR: &str = "METRICS_NAMESPACE";
pub const API_BASE_URL_VAR: &str = "BITBUCKET_API_BASE_URL";
pub const SECRET_PROVIDER_VAR: &str = "SECRET_PROVIDER";

pub const DEFAULT_METRICS_NAMESPACE: &str = "BitbucketTeamsRelay";

/// Fatal configuration problems. Startup stops when one is raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Required configuration missing: {key}")]
    RequiredConfigMissing { key: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Where secret identifiers are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretProvider {
    /// AWS Secrets Manager; identifiers are secret names or ARNs.
    Aws,
    /// Process environment; identifiers are variable names.
    Environment,
}

impl std::str::FromStr for SecretProvider {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            "env" => Ok(Self::Environment),
            other => Err(ConfigurationError::InvalidValue {
                key: SECRET_PROVIDER_VAR.to_string(),
                reason: format!("unknown secret provider '{}', expected 'aws' or 'env'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub signing_secret: String,
    pub teams_webhook_secret: String,
    /// Unset disables IP gating.
    pub ip_ranges_secret: Option<String>,
    /// Unset disables branch lookup by commit hash.
    pub api_token_secret: Option<String>,
    pub secret_ttl: Duration,
    pub ip_ranges_ttl: Duration,
    pub notification_timeout: Duration,
    pub metrics_namespace: String,
    pub api_base_url: String,
    pub secret_provider: SecretProvider,
}

impl RelayConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] when a required variable is missing or
    /// empty, or when a value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            optional(key).ok_or_else(|| ConfigurationError::RequiredConfigMissing {
                key: key.to_string(),
            })
        };
        let seconds = |key: &str, default: Duration| match optional(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigurationError::InvalidValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        };

        let notification_timeout = seconds(NOTIFICATION_TIMEOUT_VAR, DEFAULT_NOTIFICATION_TIMEOUT)?;
        if notification_timeout.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                key: NOTIFICATION_TIMEOUT_VAR.to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        let secret_provider = match optional(SECRET_PROVIDER_VAR) {
            Some(raw) => raw.parse()?,
            None => SecretProvider::Aws,
        };

        Ok(Self {
            signing_secret: required(SIGNING_SECRET_VAR)?,
            teams_webhook_secret: required(TEAMS_WEBHOOK_SECRET_VAR)?,
            ip_ranges_secret: optional(IP_RANGES_SECRET_VAR),
            api_token_secret: optional(API_TOKEN_SECRET_VAR),
            secret_ttl: seconds(SECRET_CACHE_TTL_VAR, DEFAULT_SECRET_TTL)?,
            ip_ranges_ttl: seconds(IP_RANGES_CACHE_TTL_VAR, DEFAULT_IP_RANGES_TTL)?,
            notification_timeout,
            metrics_namespace: optional(METRICS_NAMESPACE_VAR)
                .unwrap_or_else(|| DEFAULT_METRICS_NAMESPACE.to_string()),
            api_base_url: optional(API_BASE_URL_VAR)
                .unwrap_or_else(|| bitbucket_client::DEFAULT_API_BASE_URL.to_string()),
            secret_provider,
        })
    }

    pub fn relay_secrets(&self) -> RelaySecrets {
        RelaySecrets {
            signing_secret: self.signing_secret.clone(),
            teams_webhook_secret: self.teams_webhook_secret.clone(),
        }
    }
}
