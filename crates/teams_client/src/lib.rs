//! Microsoft Teams incoming-webhook notifier.
//!
//! Renders [`relay_core::FailureRecord`]s as Office 365 connector
//! MessageCards and posts them with `reqwest`.

pub mod client;
pub mod message;

pub use client::{TeamsNotifier, DEFAULT_NOTIFICATION_TIMEOUT};
pub use message::MessageCard;
