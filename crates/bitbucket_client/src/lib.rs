//! Bitbucket Cloud REST client used to name the branch of a commit.
//!
//! Commit status webhooks do not always say which branch was built. When
//! they only carry a commit hash the relay can ask the repository API for a
//! branch whose head is that commit.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::{BranchResolutionError, BranchResolver};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

pub const DEFAULT_API_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// Default time allowed for one branch lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Deserialize)]
struct BranchPage {
    #[serde(default)]
    values: Vec<BranchEntry>,
}

#[derive(Debug, Deserialize)]
struct BranchEntry {
    name: Option<String>,
}

/// Resolves branches through `GET /repositories/{workspace}/{repo}/refs/branches`.
pub struct BitbucketBranchResolver {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl BitbucketBranchResolver {
    /// Create a resolver.
    ///
    /// # Arguments
    /// * `base_url` - API root, normally [`DEFAULT_API_BASE_URL`]
    /// * `token` - Optional access token sent as a bearer credential
    /// * `timeout` - Time allowed for one lookup
    ///
    /// # Errors
    /// Returns `BranchResolutionError::Network` if `base_url` is not an
    /// absolute http(s) URL or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BranchResolutionError> {
        let base_url = Url::parse(base_url).map_err(|e| BranchResolutionError::Network {
            message: format!("invalid API base URL '{}': {}", base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BranchResolutionError::Network {
                message: format!("API base URL '{}' cannot carry a path", base_url),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BranchResolutionError::Network {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn branches_url(&self, repository: &str, commit_hash: &str) -> Result<Url, BranchResolutionError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BranchResolutionError::Network {
                message: format!("API base URL '{}' cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .push("repositories")
            .extend(repository.split('/').filter(|s| !s.is_empty()))
            .push("refs")
            .push("branches");
        url.query_pairs_mut()
            .append_pair("q", &format!("target.hash=\"{}\"", commit_hash));
        Ok(url)
    }
}

impl std::fmt::Debug for BitbucketBranchResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbucketBranchResolver")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

#[async_trait]
impl BranchResolver for BitbucketBranchResolver {
    async fn resolve_branch(
        &self,
        repository: &str,
        commit_hash: &str,
    ) -> Result<Option<String>, BranchResolutionError> {
        let url = self.branches_url(repository, commit_hash)?;

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BranchResolutionError::Network {
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                debug!(repository = %repository, "Repository not found for branch lookup");
                return Ok(None);
            }
            status => {
                warn!(
                    repository = %repository,
                    status_code = status.as_u16(),
                    "Branch lookup failed"
                );
                return Err(BranchResolutionError::HttpStatus {
                    status: status.as_u16(),
                });
            }
        }

        let page: BranchPage =
            response
                .json()
                .await
                .map_err(|e| BranchResolutionError::Deserialization {
                    message: e.to_string(),
                })?;

        Ok(page
            .values
            .into_iter()
            .filter_map(|b| b.name)
            .find(|name| !name.trim().is_empty()))
    }
}
