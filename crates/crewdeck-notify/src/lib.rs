//! Notification abstraction for crewdeck membership changes.
//!
//! The membership core only decides *that* and *what* to notify. Delivery
//! (in-app, email, push, SMS) belongs to implementations of [`Notifier`]:
//! - Memory (single process, tokio broadcast channels)
//! - Transport-backed implementations living outside this workspace

use async_trait::async_trait;
use crewdeck_storage::{PartnerId, UserId};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    InvitationIssued,
    InvitationAccepted,
    MemberDeactivated,
    MemberReactivated,
    RoleChanged,
    TasksTransferred,
}

/// How a notice should reach its recipients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeChannel {
    InApp,
    Email,
    Push,
    Sms,
}

/// Who a notice is for. Invitees have no user id yet, only a phone number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    User(UserId),
    Phone(String),
}

/// A notification decided by the membership core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub partner_id: PartnerId,
    pub recipients: Vec<Recipient>,
    pub channels: Vec<NoticeChannel>,
    pub payload: serde_json::Value,
    pub timestamp: i64,
}

/// Error type for notifier operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Stream of notices for one recipient
pub type NoticeStream = Pin<Box<dyn Stream<Item = Notice> + Send>>;

/// Notification delivery. Fire-and-forget from the caller's point of view:
/// membership operations log a failed `notify` and carry on.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notice to each of its recipients.
    async fn notify(&self, notice: Notice) -> Result<(), NotifyError>;

    /// Subscribe to notices addressed to a recipient (in-app delivery).
    ///
    /// The stream continues until dropped.
    async fn subscribe(&self, recipient: &Recipient) -> Result<NoticeStream, NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_serialization() {
        let notice = Notice {
            kind: NoticeKind::MemberDeactivated,
            partner_id: PartnerId::from("P1"),
            recipients: vec![
                Recipient::User(UserId::from("u9")),
                Recipient::Phone("+15551234567".into()),
            ],
            channels: vec![NoticeChannel::InApp, NoticeChannel::Email],
            payload: serde_json::json!({"reason": "left"}),
            timestamp: 1234567890,
        };

        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["kind"], "member_deactivated");
        assert_eq!(json["recipients"][0]["user"], "u9");
        assert_eq!(json["recipients"][1]["phone"], "+15551234567");
        assert_eq!(json["channels"], serde_json::json!(["in_app", "email"]));

        let back: Notice = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, NoticeKind::MemberDeactivated);
        assert_eq!(back.recipients.len(), 2);
    }

    #[test]
    fn test_notify_error_display() {
        let error = NotifyError::Delivery("sms gateway down".to_string());
        assert!(error.to_string().contains("delivery failed"));
        assert!(error.to_string().contains("sms gateway down"));
    }
}
