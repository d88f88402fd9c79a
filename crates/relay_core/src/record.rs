//! Normalized failure records
//!
//! A [`FailureRecord`] is what the classifier produces and the notifier
//! consumes. Every field is populated; missing payload data is replaced with
//! a fallback value rather than leaving the record partial.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;

/// Fallback used for fields the payload did not provide.
pub const UNKNOWN: &str = "unknown";

/// Number of commit hash characters used as a branch label of last resort.
pub const SHORT_HASH_LEN: usize = 7;

/// Kind of failure a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// A pull request was declined.
    PrDeclined,
    /// A commit status reported `FAILED`.
    BuildFailed,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrDeclined => "PR_DECLINED",
            Self::BuildFailed => "BUILD_FAILED",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the `branch` of a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchSource {
    /// A `refs/heads/*` or `refs/tags/*` name on the commit status.
    RefName,
    /// The branch field of the status' commit.
    CommitBranch,
    /// The source branch of a pull request.
    PullRequestSource,
    /// Looked up from the repository API by commit hash.
    Resolved,
    /// The first characters of the commit hash; no branch name was available.
    CommitHash,
    /// Nothing identified the branch.
    Unknown,
}

/// Normalized description of a notifiable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub classification: Classification,

    /// Full repository name, e.g. `team/repo`
    pub repository: String,

    /// Branch name, a short commit hash, or `"unknown"`
    pub branch: String,

    pub branch_source: BranchSource,

    /// `"PR #<id>"` for pull requests, the status key or name for builds
    pub pipeline_or_pr_label: String,

    pub triggered_by: String,

    pub reason: String,

    /// Web link to the pull request or build; empty when not provided
    pub link: String,

    /// Full commit hash, when the payload carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl FailureRecord {
    /// Whether the branch is a placeholder that a repository lookup could improve.
    pub fn branch_is_fallback(&self) -> bool {
        matches!(
            self.branch_source,
            BranchSource::CommitHash | BranchSource::Unknown
        )
    }

    /// Replace the branch with a name resolved from the repository API.
    pub fn with_resolved_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self.branch_source = BranchSource::Resolved;
        self
    }
}

/// Short label for a commit hash.
pub fn short_hash(hash: &str) -> String {
    hash.chars().take(SHORT_HASH_LEN).collect()
}
