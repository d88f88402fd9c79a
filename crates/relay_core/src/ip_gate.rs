//! Source IP allow-listing
//!
//! Bitbucket Cloud publishes the address ranges its webhooks originate from.
//! The gate checks the caller against those ranges before any signature work
//! is done.
//!
//! If the ranges cannot be fetched the caller is allowed and only the
//! signature check applies. If the caller's address cannot be determined the
//! request is rejected.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::errors::{CidrParseError, IpRangesError};
use crate::request::{InboundRequest, FORWARDED_FOR_HEADER};
use crate::secret_cache::SecretCache;

#[cfg(test)]
#[path = "ip_gate_tests.rs"]
mod tests;

/// A parsed CIDR block such as `104.192.136.0/21`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    /// Parse a CIDR string of the form `address/prefix`.
    ///
    /// # Errors
    /// Returns a [`CidrParseError`] when the prefix is missing, the address is
    /// not an IPv4 or IPv6 address, or the prefix is longer than the address.
    pub fn parse(range: &str) -> Result<Self, CidrParseError> {
        let range = range.trim();
        let (address, prefix) = range
            .split_once('/')
            .ok_or_else(|| CidrParseError::MissingPrefix {
                range: range.to_string(),
            })?;

        let network =
            IpAddr::from_str(address.trim()).map_err(|_| CidrParseError::InvalidAddress {
                range: range.to_string(),
            })?;

        let max_prefix = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix_len = prefix
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= max_prefix)
            .ok_or_else(|| CidrParseError::InvalidPrefix {
                range: range.to_string(),
            })?;

        Ok(Self {
            network,
            prefix_len,
        })
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Whether `ip` lies inside this block.
    ///
    /// `(ip & mask) == (network & mask)` with the top `prefix_len` bits of the
    /// mask set. Addresses of the other family never match.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(network), IpAddr::V4(candidate)) => {
                let mask = u32::MAX
                    .checked_shl(32 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u32::from(*candidate) & mask) == (u32::from(network) & mask)
            }
            (IpAddr::V6(network), IpAddr::V6(candidate)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u128::from(*candidate) & mask) == (u128::from(network) & mask)
            }
            _ => false,
        }
    }
}

impl FromStr for CidrRange {
    type Err = CidrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for CidrRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

/// Returns `true` iff `source_ip` lies in at least one of `ranges`.
///
/// Malformed ranges are skipped with a warning. A malformed `source_ip`
/// yields `false`.
pub fn is_allowed<S: AsRef<str>>(source_ip: &str, ranges: &[S]) -> bool {
    let Ok(ip) = IpAddr::from_str(source_ip.trim()) else {
        warn!(source_ip = %source_ip, "Source IP is not a valid address");
        return false;
    };

    ranges.iter().any(|range| match CidrRange::parse(range.as_ref()) {
        Ok(cidr) => cidr.contains(&ip),
        Err(e) => {
            warn!(error = %e, "Skipping malformed CIDR range");
            false
        }
    })
}

/// Determine the caller's address.
///
/// The platform-reported connection source wins over `X-Forwarded-For`, since
/// the caller controls the header. For a forwarded list only the first entry
/// is used.
pub fn extract_source_ip(request: &InboundRequest) -> Option<String> {
    if let Some(ip) = request
        .source_ip
        .as_deref()
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return Some(ip.to_string());
    }

    request
        .header(FORWARDED_FOR_HEADER)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct IpRangesSecret {
    ip_ranges: Option<Vec<String>>,
}

/// Parse the allow-list secret, stored as `{"ip_ranges": ["a.b.c.d/e", ...]}`.
///
/// # Errors
/// Returns an [`IpRangesError`] when the value is not JSON of that shape.
pub fn parse_ip_ranges(secret: &str) -> Result<Vec<String>, IpRangesError> {
    let parsed: IpRangesSecret =
        serde_json::from_str(secret).map_err(|e| IpRangesError::InvalidJson {
            reason: e.to_string(),
        })?;

    parsed.ip_ranges.ok_or(IpRangesError::MissingRanges)
}

/// Outcome of gating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpDecision {
    /// The caller's address is inside a configured range.
    Allowed,
    /// The ranges could not be retrieved, so the caller was let through.
    AllowedOnLookupFailure,
    /// The caller's address is outside every configured range.
    NotAllowed { source_ip: String },
    /// Neither a platform source address nor a forwarded address was present.
    UnknownSource,
}

impl IpDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed | Self::AllowedOnLookupFailure)
    }
}

/// Gate checking callers against the allow-list held in a secret.
pub struct IpGate {
    cache: Arc<SecretCache>,
    ranges_secret: String,
}

impl IpGate {
    /// Create a gate reading its ranges from `ranges_secret` through `cache`.
    ///
    /// # Arguments
    /// * `cache` - Cache used for the allow-list secret (long TTL)
    /// * `ranges_secret` - Identifier of the allow-list secret
    pub fn new(cache: Arc<SecretCache>, ranges_secret: impl Into<String>) -> Self {
        Self {
            cache,
            ranges_secret: ranges_secret.into(),
        }
    }

    /// Decide whether `source_ip` may proceed.
    pub async fn check(&self, source_ip: Option<&str>) -> IpDecision {
        let Some(source_ip) = source_ip else {
            warn!("Could not determine source IP; rejecting request");
            return IpDecision::UnknownSource;
        };

        let ranges = match self.load_ranges().await {
            Ok(ranges) => ranges,
            Err(reason) => {
                error!(
                    source_ip = %source_ip,
                    error = %reason,
                    "Failed to load allowed IP ranges; allowing request"
                );
                return IpDecision::AllowedOnLookupFailure;
            }
        };

        if is_allowed(source_ip, &ranges) {
            debug!(source_ip = %source_ip, "Source IP is in an allowed range");
            IpDecision::Allowed
        } else {
            warn!(source_ip = %source_ip, "Source IP is not in any allowed range");
            IpDecision::NotAllowed {
                source_ip: source_ip.to_string(),
            }
        }
    }

    async fn load_ranges(&self) -> Result<Vec<String>, String> {
        let secret = self
            .cache
            .get(&self.ranges_secret)
            .await
            .map_err(|e| e.to_string())?;
        parse_ip_ranges(&secret).map_err(|e| e.to_string())
    }
}
