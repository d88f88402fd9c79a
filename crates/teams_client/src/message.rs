//! Office 365 connector MessageCard payloads.
//!
//! See <https://learn.microsoft.com/outlook/actionable-messages/message-card-reference>.

use relay_core::{Classification, FailureRecord};
use serde::Serialize;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

pub const CARD_TYPE: &str = "MessageCard";
pub const CARD_CONTEXT: &str = "https://schema.org/extensions";

/// Accent colour for failed builds (red).
pub const BUILD_FAILED_COLOR: &str = "E81123";

/// Accent colour for declined pull requests (orange).
pub const PR_DECLINED_COLOR: &str = "FF8C00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCard {
    #[serde(rename = "@type")]
    pub card_type: String,

    #[serde(rename = "@context")]
    pub context: String,

    pub theme_color: String,

    /// Shown in notification previews
    pub summary: String,

    pub title: String,

    pub sections: Vec<CardSection>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub potential_action: Vec<CardAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSection {
    pub activity_title: String,
    pub activity_subtitle: String,
    pub facts: Vec<CardFact>,
    pub markdown: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardFact {
    pub name: String,
    pub value: String,
}

impl CardFact {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// An `OpenUri` button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardAction {
    #[serde(rename = "@type")]
    pub action_type: String,
    pub name: String,
    pub targets: Vec<CardTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardTarget {
    pub os: String,
    pub uri: String,
}

impl MessageCard {
    /// Build the card announcing `record`.
    pub fn from_record(record: &FailureRecord) -> Self {
        let (color, title, label_name, action_name) = match record.classification {
            Classification::BuildFailed => (
                BUILD_FAILED_COLOR,
                format!("Build failed: {}", record.repository),
                "Pipeline",
                "View build",
            ),
            Classification::PrDeclined => (
                PR_DECLINED_COLOR,
                format!("Pull request declined: {}", record.repository),
                "Pull request",
                "View pull request",
            ),
        };

        let facts = vec![
            CardFact::new("Repository", record.repository.as_str()),
            CardFact::new("Branch", record.branch.as_str()),
            CardFact::new(label_name, record.pipeline_or_pr_label.as_str()),
            CardFact::new("Triggered by", record.triggered_by.as_str()),
            CardFact::new("Reason", record.reason.as_str()),
        ];

        let potential_action = if record.link.trim().is_empty() {
            Vec::new()
        } else {
            vec![CardAction {
                action_type: "OpenUri".to_string(),
                name: action_name.to_string(),
                targets: vec![CardTarget {
                    os: "default".to_string(),
                    uri: record.link.clone(),
                }],
            }]
        };

        Self {
            card_type: CARD_TYPE.to_string(),
            context: CARD_CONTEXT.to_string(),
            theme_color: color.to_string(),
            summary: title.clone(),
            title,
            sections: vec![CardSection {
                activity_title: record.pipeline_or_pr_label.clone(),
                activity_subtitle: format!("Triggered by {}", record.triggered_by),
                facts,
                markdown: true,
            }],
            potential_action,
        }
    }
}
