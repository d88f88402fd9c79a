//! Failure classification
//!
//! Decides whether a webhook describes a failure worth notifying about and,
//! if so, extracts a [`FailureRecord`]. The decision table:
//!
//! | Event key                                                 | Condition                  | Result        |
//! |-----------------------------------------------------------|----------------------------|---------------|
//! | `pullrequest:rejected`                                    | -                          | `PR_DECLINED` |
//! | `repo:commit_status_created` / `repo:commit_status_updated` | `commit_status.state == "FAILED"` | `BUILD_FAILED` |
//! | `repo:commit_status_created` / `repo:commit_status_updated` | any other state            | none          |
//! | anything else                                             | -                          | none          |
//!
//! Classification is pure and never panics on JSON input. A payload missing
//! the event's root object or any repository identifier yields `None`.

use serde_json::Value;
use tracing::debug;

use crate::errors::PayloadError;
use crate::payload::{
    non_blank, BitbucketEvent, CommitStatusPayload, EventKind, PullRequestPayload,
};
use crate::record::{short_hash, BranchSource, Classification, FailureRecord, UNKNOWN};

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;

/// Commit status state that marks a failed build. Compared case-sensitively.
pub const FAILED_STATE: &str = "FAILED";

/// Label used for builds whose status has neither key nor name.
pub const DEFAULT_PIPELINE_LABEL: &str = "Pipeline";

/// Reason used for failed builds without a description.
pub const DEFAULT_BUILD_REASON: &str = "Build failed";

/// Classify a webhook payload.
///
/// # Arguments
/// * `event_type` - Value of the `X-Event-Key` header
/// * `payload` - Parsed request body
///
/// # Returns
/// The failure record, or `None` when the event is not a failure or the
/// payload lacks the identity fields a record needs.
pub fn classify(event_type: &str, payload: &Value) -> Option<FailureRecord> {
    let kind = EventKind::from_event_key(event_type);

    let event = match BitbucketEvent::parse(&kind, payload) {
        Ok(event) => event,
        Err(e) => {
            debug!(event_type = %event_type, error = %e, "Payload does not match event type");
            return None;
        }
    };

    let result = match &event {
        BitbucketEvent::PullRequestRejected(pr) => pull_request_declined(event_type, pr).map(Some),
        BitbucketEvent::CommitStatus(status) => build_failed(event_type, status),
        BitbucketEvent::Unsupported(_) => Ok(None),
    };

    match result {
        Ok(record) => record,
        Err(e) => {
            debug!(event_type = %event_type, error = %e, "Payload lacks required identity fields");
            None
        }
    }
}

fn pull_request_declined(
    event_type: &str,
    payload: &PullRequestPayload,
) -> Result<FailureRecord, PayloadError> {
    let pr = payload
        .pullrequest
        .as_ref()
        .ok_or_else(|| PayloadError::MissingObject {
            event_type: event_type.to_string(),
            object: "pullrequest".to_string(),
        })?;

    let id = pr.id_label().ok_or_else(|| PayloadError::UnexpectedShape {
        event_type: event_type.to_string(),
        reason: "pull request has no id".to_string(),
    })?;

    let repository = payload
        .repository
        .as_ref()
        .and_then(|r| r.identifier())
        .ok_or_else(|| PayloadError::MissingRepository {
            event_type: event_type.to_string(),
        })?;

    let label = format!("PR #{}", id);

    let triggered_by = payload
        .actor
        .as_ref()
        .and_then(|a| a.identifier())
        .or_else(|| pr.author.as_ref().and_then(|a| a.identifier()))
        .unwrap_or(UNKNOWN);

    let subject = non_blank(pr.title.as_deref()).unwrap_or(label.as_str());
    let reason = match non_blank(pr.reason.as_deref()) {
        Some(decline_reason) => format!("Declined: {} ({})", subject, decline_reason),
        None => format!("Declined: {}", subject),
    };

    let (branch, branch_source) = match pr.source_branch() {
        Some(branch) => (branch.to_string(), BranchSource::PullRequestSource),
        None => (UNKNOWN.to_string(), BranchSource::Unknown),
    };

    Ok(FailureRecord {
        classification: Classification::PrDeclined,
        repository: repository.to_string(),
        branch,
        branch_source,
        pipeline_or_pr_label: label,
        triggered_by: triggered_by.to_string(),
        reason,
        link: pr.html_link().unwrap_or_default().to_string(),
        commit: None,
    })
}

fn build_failed(
    event_type: &str,
    payload: &CommitStatusPayload,
) -> Result<Option<FailureRecord>, PayloadError> {
    let status = payload
        .commit_status
        .as_ref()
        .ok_or_else(|| PayloadError::MissingObject {
            event_type: event_type.to_string(),
            object: "commit_status".to_string(),
        })?;

    if status.state.as_deref() != Some(FAILED_STATE) {
        debug!(
            event_type = %event_type,
            state = ?status.state,
            "Commit status is not a failure"
        );
        return Ok(None);
    }

    let repository = payload
        .repository
        .as_ref()
        .and_then(|r| r.identifier())
        .or_else(|| status.repository.as_ref().and_then(|r| r.identifier()))
        .ok_or_else(|| PayloadError::MissingRepository {
            event_type: event_type.to_string(),
        })?;

    let triggered_by = payload
        .actor
        .as_ref()
        .and_then(|a| a.identifier())
        .unwrap_or(UNKNOWN);

    let label = non_blank(status.key.as_deref())
        .or_else(|| non_blank(status.name.as_deref()))
        .unwrap_or(DEFAULT_PIPELINE_LABEL);

    let reason = non_blank(status.description.as_deref()).unwrap_or(DEFAULT_BUILD_REASON);

    let commit_hash = status
        .commit
        .as_ref()
        .and_then(|c| non_blank(c.hash.as_deref()));

    let (branch, branch_source) = if let Some(name) = branch_from_ref(status.refname.as_deref()) {
        (name, BranchSource::RefName)
    } else if let Some(name) = status
        .commit
        .as_ref()
        .and_then(|c| non_blank(c.branch.as_deref()))
    {
        (name.to_string(), BranchSource::CommitBranch)
    } else if let Some(hash) = commit_hash {
        (short_hash(hash), BranchSource::CommitHash)
    } else {
        (UNKNOWN.to_string(), BranchSource::Unknown)
    };

    Ok(Some(FailureRecord {
        classification: Classification::BuildFailed,
        repository: repository.to_string(),
        branch,
        branch_source,
        pipeline_or_pr_label: label.to_string(),
        triggered_by: triggered_by.to_string(),
        reason: reason.to_string(),
        link: non_blank(status.url.as_deref()).unwrap_or_default().to_string(),
        commit: commit_hash.map(str::to_string),
    }))
}

/// Branch name from a ref, without any `refs/heads/` or `refs/tags/` prefix.
pub fn branch_from_ref(refname: Option<&str>) -> Option<String> {
    let refname = non_blank(refname)?;
    let name = refname
        .strip_prefix("refs/heads/")
        .or_else(|| refname.strip_prefix("refs/tags/"))
        .unwrap_or(refname);

    non_blank(Some(name)).map(str::to_string)
}
