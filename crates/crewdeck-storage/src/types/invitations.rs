//! Invitation code records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{InvitationId, InvitationStatus, MemberRole, PartnerId, TenantId, UserId};

/// A pending (or resolved) grant of membership to one phone number in one partner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvitationCode {
    pub id: InvitationId,
    pub code: String,
    pub phone_number: String,
    pub name: String,
    pub partner_id: PartnerId,
    pub tenant_id: TenantId,
    pub role: MemberRole,
    pub invited_by: UserId,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_by: Option<UserId>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl InvitationCode {
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    /// Expired strictly after `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn accept(&mut self, by: &UserId, at: DateTime<Utc>) {
        self.status = InvitationStatus::Accepted;
        self.accepted_by = Some(by.clone());
        self.accepted_at = Some(at);
    }

    /// Move to a terminal non-accepted status (`expired` or `cancelled`).
    pub fn close(&mut self, status: InvitationStatus, by: Option<&UserId>, at: DateTime<Utc>) {
        self.status = status;
        self.resolved_by = by.cloned();
        self.resolved_at = Some(at);
    }
}
