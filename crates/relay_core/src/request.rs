//! Inbound webhook request types
//!
//! The transport layer hands the pipeline an [`InboundRequest`]; the pipeline
//! derives a [`WebhookEnvelope`] from it once the event type and signature
//! headers are known to be present and the body has been decoded.

use base64::Engine;
use http::HeaderMap;

use crate::errors::EnvelopeError;

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

/// Header carrying the Bitbucket event key, e.g. `pullrequest:rejected`.
pub const EVENT_KEY_HEADER: &str = "X-Event-Key";

/// Header carrying the `sha256=<hex>` HMAC of the body.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

/// Header used by proxies to carry the original client address.
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// A webhook request as received from the transport.
///
/// Header lookups through [`HeaderMap`] are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// Request headers
    pub headers: HeaderMap,

    /// Body exactly as delivered by the transport
    pub raw_body: String,

    /// Whether `raw_body` is base64 encoded by the transport
    pub is_base64_encoded: bool,

    /// Connection source address reported by the platform, if any
    pub source_ip: Option<String>,
}

impl InboundRequest {
    /// Create a request with a plain-text body and no platform source address.
    pub fn new(headers: HeaderMap, raw_body: impl Into<String>) -> Self {
        Self {
            headers,
            raw_body: raw_body.into(),
            is_base64_encoded: false,
            source_ip: None,
        }
    }

    /// Mark the body as base64 encoded.
    pub fn with_base64_body(mut self, is_base64_encoded: bool) -> Self {
        self.is_base64_encoded = is_base64_encoded;
        self
    }

    /// Set the platform-reported source address.
    pub fn with_source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = Some(source_ip.into());
        self
    }

    /// Look up a header value, ignoring case. Values that are not visible
    /// ASCII are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// Decode the body according to the transport's base64 flag.
    ///
    /// # Errors
    /// Returns `EnvelopeError::InvalidBase64` or `EnvelopeError::InvalidUtf8`
    /// when a base64 body cannot be turned back into text.
    pub fn decoded_body(&self) -> Result<String, EnvelopeError> {
        if !self.is_base64_encoded {
            return Ok(self.raw_body.clone());
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(self.raw_body.trim())
            .map_err(|_| EnvelopeError::InvalidBase64)?;

        String::from_utf8(bytes).map_err(|_| EnvelopeError::InvalidUtf8)
    }
}

/// Case-insensitive header lookup returning a trimmed value.
pub fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// A request whose event type and signature are known and whose body is decoded.
///
/// `event_type` and `signature_header` are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEnvelope {
    event_type: String,
    signature_header: String,
    body: String,
}

impl WebhookEnvelope {
    /// Extract the envelope from an inbound request.
    ///
    /// # Errors
    /// Returns an [`EnvelopeError`] when either required header is missing or
    /// blank, or when the body cannot be decoded.
    pub fn from_request(request: &InboundRequest) -> Result<Self, EnvelopeError> {
        let event_type = request
            .header(EVENT_KEY_HEADER)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EnvelopeError::MissingEventType {
                header: EVENT_KEY_HEADER.to_string(),
            })?;

        let signature_header = request
            .header(SIGNATURE_HEADER)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EnvelopeError::MissingSignature {
                header: SIGNATURE_HEADER.to_string(),
            })?;

        let body = request.decoded_body()?;

        Ok(Self {
            event_type: event_type.to_string(),
            signature_header: signature_header.to_string(),
            body,
        })
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn signature_header(&self) -> &str {
        &self.signature_header
    }

    /// The decoded body, as signed by the sender.
    pub fn body(&self) -> &str {
        &self.body
    }
}
