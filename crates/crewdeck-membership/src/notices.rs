use std::sync::Arc;

use chrono::Utc;
use crewdeck_notify::{Notice, NoticeChannel, NoticeKind, Notifier, Recipient};
use crewdeck_storage::PartnerId;

use crate::metrics;
use crate::response::{CascadeFailure, CascadeStep};

/// Decides which channels a notice goes out on and hands it to the notifier.
#[derive(Clone)]
pub struct Notices {
    notifier: Arc<dyn Notifier>,
}

impl Notices {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn channels_for(kind: NoticeKind) -> Vec<NoticeChannel> {
        match kind {
            NoticeKind::InvitationIssued => vec![NoticeChannel::Sms],
            NoticeKind::InvitationAccepted | NoticeKind::TasksTransferred => {
                vec![NoticeChannel::InApp]
            }
            NoticeKind::MemberDeactivated
            | NoticeKind::MemberReactivated
            | NoticeKind::RoleChanged => vec![NoticeChannel::InApp, NoticeChannel::Email],
        }
    }

    /// Fire-and-forget delivery; a failure is logged and reported back.
    pub async fn send(
        &self,
        kind: NoticeKind,
        partner_id: &PartnerId,
        recipients: Vec<Recipient>,
        payload: serde_json::Value,
    ) -> Result<(), CascadeFailure> {
        let notice = Notice {
            kind,
            partner_id: partner_id.clone(),
            recipients,
            channels: Self::channels_for(kind),
            payload,
            timestamp: Utc::now().timestamp(),
        };
        if let Err(e) = self.notifier.notify(notice).await {
            tracing::warn!(kind = ?kind, partner_id = %partner_id, error = %e, "notification failed");
            metrics::record_cascade_failure(CascadeStep::Notification.as_str());
            return Err(CascadeFailure {
                step: CascadeStep::Notification,
                message: e.to_string(),
            });
        }
        Ok(())
    }
}
