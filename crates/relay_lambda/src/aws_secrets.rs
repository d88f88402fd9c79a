//! AWS Secrets Manager secret resolver.
//!
//! Uses the official aws-sdk-secretsmanager crate with the Lambda execution
//! role's credentials.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use relay_core::{SecretResolutionError, SecretResolver};
use tracing::debug;

#[cfg(test)]
#[path = "aws_secrets_tests.rs"]
mod tests;

/// Resolves secret names or ARNs through `GetSecretValue`.
#[derive(Debug, Clone)]
pub struct AwsSecretsManagerResolver {
    client: aws_sdk_secretsmanager::Client,
}

impl AwsSecretsManagerResolver {
    pub fn new(client: aws_sdk_secretsmanager::Client) -> Self {
        Self { client }
    }

    /// Create a resolver from the default AWS configuration chain.
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(aws_sdk_secretsmanager::Client::new(&sdk_config))
    }
}

#[async_trait]
impl SecretResolver for AwsSecretsManagerResolver {
    async fn resolve_secret(&self, secret_ref: &str) -> Result<String, SecretResolutionError> {
        let result = self
            .client
            .get_secret_value()
            .secret_id(secret_ref)
            .send()
            .await
            .map_err(|e| map_sdk_error(secret_ref, e))?;

        let value = secret_value(
            secret_ref,
            result.secret_string(),
            result.secret_binary().map(|b| b.as_ref()),
        )?;

        debug!(
            secret_ref = %secret_ref,
            version = ?result.version_id(),
            "Secret loaded from AWS Secrets Manager"
        );

        Ok(value)
    }
}

/// Extract a trimmed secret from a `GetSecretValue` response body, which holds
/// either a string or a binary payload.
pub(crate) fn secret_value(
    secret_ref: &str,
    secret_string: Option<&str>,
    secret_binary: Option<&[u8]>,
) -> Result<String, SecretResolutionError> {
    let raw = match (secret_string, secret_binary) {
        (Some(s), _) => s.to_string(),
        (None, Some(bytes)) => String::from_utf8(bytes.to_vec()).map_err(|_| {
            SecretResolutionError::InvalidFormat {
                reference: secret_ref.to_string(),
                reason: "binary secret is not UTF-8".to_string(),
            }
        })?,
        (None, None) => {
            return Err(SecretResolutionError::InvalidFormat {
                reference: secret_ref.to_string(),
                reason: "secret has neither a string nor a binary value".to_string(),
            })
        }
    };

    let value = raw.trim();
    if value.is_empty() {
        return Err(SecretResolutionError::InvalidFormat {
            reference: secret_ref.to_string(),
            reason: "secret value is empty".to_string(),
        });
    }

    Ok(value.to_string())
}

fn map_sdk_error(secret_ref: &str, error: SdkError<GetSecretValueError>) -> SecretResolutionError {
    let service_error = match error {
        SdkError::ServiceError(context) => context.into_err(),
        other => {
            return SecretResolutionError::NetworkError {
                message: DisplayErrorContext(&other).to_string(),
            }
        }
    };

    if matches!(service_error, GetSecretValueError::ResourceNotFoundException(_)) {
        return SecretResolutionError::NotFound {
            reference: secret_ref.to_string(),
        };
    }

    match service_error.code() {
        Some("AccessDeniedException") => SecretResolutionError::AccessDenied {
            reference: secret_ref.to_string(),
        },
        _ => SecretResolutionError::Other {
            message: DisplayErrorContext(&service_error).to_string(),
        },
    }
}
