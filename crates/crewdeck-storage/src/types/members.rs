//! Membership records: the `TeamMember` document and the `WorkspaceLink`
//! authorization binding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MemberRole, MembershipStatus, PartnerId, TenantId, UserId};

/// Team member record, one per (partner, user). Never hard-deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub partner_id: PartnerId,
    pub user_id: UserId,
    pub name: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub role: MemberRole,
    pub status: MembershipStatus,
    pub skills: Vec<String>,
    pub tasks_completed: u32,
    pub suspended_at: Option<DateTime<Utc>>,
    pub suspended_by: Option<UserId>,
    pub suspension_reason: Option<String>,
    pub reactivated_at: Option<DateTime<Utc>>,
    pub reactivated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamMember {
    pub fn is_suspended(&self) -> bool {
        self.status == MembershipStatus::Suspended
    }

    /// Flip to `suspended`, recording who did it and why.
    pub fn suspend(&mut self, by: &UserId, reason: Option<String>, at: DateTime<Utc>) {
        self.status = MembershipStatus::Suspended;
        self.suspended_at = Some(at);
        self.suspended_by = Some(by.clone());
        self.suspension_reason = reason;
        self.updated_at = at;
    }

    /// Flip back to `active`, clearing suspension metadata.
    pub fn reactivate(&mut self, by: &UserId, at: DateTime<Utc>) {
        self.status = MembershipStatus::Active;
        self.suspended_at = None;
        self.suspended_by = None;
        self.suspension_reason = None;
        self.reactivated_at = Some(at);
        self.reactivated_by = Some(by.clone());
        self.updated_at = at;
    }
}

/// User-to-partner authorization binding.
///
/// At most one exists per (user, partner). Stores key it by that pair, never
/// by a string built from it, so writing the same pair twice updates one record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceLink {
    pub user_id: UserId,
    pub partner_id: PartnerId,
    pub tenant_id: TenantId,
    pub role: MemberRole,
    pub status: MembershipStatus,
    pub permissions: Vec<String>,
    pub joined_at: DateTime<Utc>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceLink {
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> TeamMember {
        let now = Utc::now();
        TeamMember {
            partner_id: PartnerId::from("P1"),
            user_id: UserId::from("u9"),
            name: "Dana".into(),
            phone_number: Some("+15551234567".into()),
            email: None,
            role: MemberRole::Employee,
            status: MembershipStatus::Active,
            skills: vec![],
            tasks_completed: 0,
            suspended_at: None,
            suspended_by: None,
            suspension_reason: None,
            reactivated_at: None,
            reactivated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_suspend_then_reactivate_clears_metadata() {
        let mut m = member();
        let admin = UserId::from("admin1");
        m.suspend(&admin, Some("left company".into()), Utc::now());
        assert!(m.is_suspended());
        assert_eq!(m.suspended_by, Some(admin.clone()));
        assert_eq!(m.suspension_reason.as_deref(), Some("left company"));

        m.reactivate(&admin, Utc::now());
        assert_eq!(m.status, MembershipStatus::Active);
        assert!(m.suspended_at.is_none());
        assert!(m.suspended_by.is_none());
        assert!(m.suspension_reason.is_none());
        assert_eq!(m.reactivated_by, Some(admin));
    }
}
