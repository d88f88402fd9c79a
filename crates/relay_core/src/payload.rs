//! Typed Bitbucket webhook payloads.
//!
//! Bitbucket sends many event shapes on one endpoint. The event key decides
//! which payload type applies; each payload type is parsed on its own. Every
//! field is optional and a field holding the wrong JSON type reads as absent,
//! so only a payload root that is not an object fails the parse.
//!
//! See <https://support.atlassian.com/bitbucket-cloud/docs/event-payloads/>.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::PayloadError;

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;

/// Event keys the relay distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `pullrequest:rejected`
    PullRequestRejected,
    /// `repo:commit_status_created`
    CommitStatusCreated,
    /// `repo:commit_status_updated`
    CommitStatusUpdated,
    /// Any other event key
    Other(String),
}

impl EventKind {
    /// Map an `X-Event-Key` value to an event kind. Matching is exact.
    pub fn from_event_key(event_key: &str) -> Self {
        match event_key {
            "pullrequest:rejected" => Self::PullRequestRejected,
            "repo:commit_status_created" => Self::CommitStatusCreated,
            "repo:commit_status_updated" => Self::CommitStatusUpdated,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PullRequestRejected => "pullrequest:rejected",
            Self::CommitStatusCreated => "repo:commit_status_created",
            Self::CommitStatusUpdated => "repo:commit_status_updated",
            Self::Other(key) => key,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    #[serde(default, deserialize_with = "lenient")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

impl Repository {
    /// `full_name`, falling back to `name`. Blank values count as absent.
    pub fn identifier(&self) -> Option<&str> {
        non_blank(self.full_name.as_deref()).or_else(|| non_blank(self.name.as_deref()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Actor {
    #[serde(default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub nickname: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub username: Option<String>,
}

impl Actor {
    /// The most human-readable identifier the actor carries.
    pub fn identifier(&self) -> Option<&str> {
        non_blank(self.display_name.as_deref())
            .or_else(|| non_blank(self.nickname.as_deref()))
            .or_else(|| non_blank(self.username.as_deref()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Link {
    #[serde(default, deserialize_with = "lenient")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestLinks {
    #[serde(default, deserialize_with = "lenient")]
    pub html: Option<Link>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchName {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestEndpoint {
    #[serde(default, deserialize_with = "lenient")]
    pub branch: Option<BranchName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    /// Numeric in practice; kept untyped so string ids are tolerated.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    /// Free-text reason entered when declining.
    #[serde(default, deserialize_with = "lenient")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub author: Option<Actor>,
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<PullRequestEndpoint>,
    #[serde(default, deserialize_with = "lenient")]
    pub links: Option<PullRequestLinks>,
}

impl PullRequest {
    /// The id rendered as text, when it is a number or a non-blank string.
    pub fn id_label(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => non_blank(Some(s)).map(str::to_string),
            _ => None,
        }
    }

    pub fn html_link(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|l| l.html.as_ref())
            .and_then(|h| non_blank(h.href.as_deref()))
    }

    pub fn source_branch(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.branch.as_ref())
            .and_then(|b| non_blank(b.name.as_deref()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub pullrequest: Option<PullRequest>,
    #[serde(default, deserialize_with = "lenient")]
    pub repository: Option<Repository>,
    #[serde(default, deserialize_with = "lenient")]
    pub actor: Option<Actor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commit {
    #[serde(default, deserialize_with = "lenient")]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitStatus {
    /// `SUCCESSFUL`, `FAILED`, `INPROGRESS` or `STOPPED`
    #[serde(default, deserialize_with = "lenient")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub refname: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub commit: Option<Commit>,
    #[serde(default, deserialize_with = "lenient")]
    pub repository: Option<Repository>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitStatusPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub commit_status: Option<CommitStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub repository: Option<Repository>,
    #[serde(default, deserialize_with = "lenient")]
    pub actor: Option<Actor>,
}

/// A payload parsed according to its event kind.
#[derive(Debug, Clone)]
pub enum BitbucketEvent {
    PullRequestRejected(PullRequestPayload),
    CommitStatus(CommitStatusPayload),
    /// An event the relay never notifies about; its payload is not inspected.
    Unsupported(String),
}

impl BitbucketEvent {
    /// Parse `payload` as the payload type for `kind`.
    ///
    /// # Errors
    /// Returns `PayloadError::UnexpectedShape` when the payload root is not a
    /// JSON object.
    pub fn parse(kind: &EventKind, payload: &Value) -> Result<Self, PayloadError> {
        let shape_error = |e: serde_json::Error| PayloadError::UnexpectedShape {
            event_type: kind.as_str().to_string(),
            reason: e.to_string(),
        };

        match kind {
            EventKind::PullRequestRejected => PullRequestPayload::deserialize(payload)
                .map(Self::PullRequestRejected)
                .map_err(shape_error),
            EventKind::CommitStatusCreated | EventKind::CommitStatusUpdated => {
                CommitStatusPayload::deserialize(payload)
                    .map(Self::CommitStatus)
                    .map_err(shape_error)
            }
            EventKind::Other(key) => Ok(Self::Unsupported(key.clone())),
        }
    }
}

/// Deserialize an optional field, reading a value of the wrong type as `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// `Some(s)` when `s` has non-whitespace content.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
