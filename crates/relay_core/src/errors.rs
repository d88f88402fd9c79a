//! Error types for the relay pipeline.
//!
//! Every error raised inside the pipeline is absorbed by the orchestrator and
//! turned into a [`crate::RelayOutcome`]. None of these types carry secret
//! values in their messages.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Error type for secret resolution failures.
///
/// Security note: Does NOT include secret values in error messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SecretResolutionError {
    #[error("Secret not found: {reference}")]
    NotFound { reference: String },

    #[error("Access denied to secret: {reference}")]
    AccessDenied { reference: String },

    #[error("Invalid secret value for {reference}: {reason}")]
    InvalidFormat { reference: String, reason: String },

    #[error("Network error resolving secret: {message}")]
    NetworkError { message: String },

    #[error("Secret resolution error: {message}")]
    Other { message: String },
}

/// Raised by [`crate::SecretCache`] when the store fails and no fresh entry exists.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SecretCacheError {
    #[error("Secret unavailable: {key}")]
    SecretUnavailable {
        key: String,
        #[source]
        source: SecretResolutionError,
    },
}

/// Failures while turning an [`crate::InboundRequest`] into a [`crate::WebhookEnvelope`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Missing or empty event type header: {header}")]
    MissingEventType { header: String },

    #[error("Missing or empty signature header: {header}")]
    MissingSignature { header: String },

    #[error("Request body is not valid base64")]
    InvalidBase64,

    #[error("Request body is not valid UTF-8")]
    InvalidUtf8,
}

/// Signature verification failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("no signature found")]
    MissingSignature,

    #[error("failed to initialize HMAC-SHA256")]
    InvalidHmacKey,

    #[error("signature mismatch")]
    Mismatch,
}

/// A CIDR range string that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrParseError {
    #[error("CIDR range '{range}' has no prefix length")]
    MissingPrefix { range: String },

    #[error("CIDR range '{range}' has an invalid network address")]
    InvalidAddress { range: String },

    #[error("CIDR range '{range}' has an invalid prefix length")]
    InvalidPrefix { range: String },
}

/// The IP allow-list secret could not be interpreted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IpRangesError {
    #[error("IP range secret is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("IP range secret has no 'ip_ranges' list")]
    MissingRanges,
}

/// Failures delivering a notification to the chat webhook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Failed to serialize notification: {message}")]
    Serialization { message: String },

    #[error("Notification request to {host} failed: {message}")]
    Network { host: String, message: String },

    #[error("Notification request to {host} timed out after {timeout_secs}s")]
    Timeout { host: String, timeout_secs: u64 },

    #[error("Notification endpoint {host} returned HTTP {status}")]
    HttpStatus { host: String, status: u16 },
}

/// Failures looking up the branch that contains a commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BranchResolutionError {
    #[error("Branch lookup request failed: {message}")]
    Network { message: String },

    #[error("Branch lookup returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Failed to deserialize branch lookup response: {message}")]
    Deserialization { message: String },
}

/// A payload whose shape does not fit the event it was delivered for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload for {event_type} has an unexpected shape: {reason}")]
    UnexpectedShape { event_type: String, reason: String },

    #[error("Payload for {event_type} has no '{object}' object")]
    MissingObject { event_type: String, object: String },

    #[error("Payload for {event_type} does not identify a repository")]
    MissingRepository { event_type: String },
}
