//! Branch lookup for commits that arrive without a branch.

use async_trait::async_trait;

use crate::errors::BranchResolutionError;

/// Finds the branch a commit belongs to.
#[async_trait]
pub trait BranchResolver: Send + Sync {
    /// Look up a branch whose head is `commit_hash`.
    ///
    /// # Arguments
    /// * `repository` - Repository full name, e.g. `team/repo`
    /// * `commit_hash` - Full commit hash
    ///
    /// # Returns
    /// `Ok(None)` when no branch points at the commit.
    ///
    /// # Errors
    /// Returns `BranchResolutionError` when the lookup itself fails.
    async fn resolve_branch(
        &self,
        repository: &str,
        commit_hash: &str,
    ) -> Result<Option<String>, BranchResolutionError>;
}
