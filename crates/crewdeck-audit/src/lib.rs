//! Audit logging abstraction for crewdeck.
//!
//! This crate defines the `AuditLog` trait for persisting audit events
//! and the types representing auditable membership actions. Entries are
//! append-only: nothing here updates or deletes them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewdeck_storage::{PartnerId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for an audit log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditLogId(pub Uuid);

impl AuditLogId {
    /// Generate a new audit log ID using UUID v7 (time-ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AuditLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AuditLogId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Categories of auditable actions.
///
/// Serialized, displayed and stored under the same dotted name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    // Invitations
    #[serde(rename = "invitation.issue")]
    InvitationIssue,
    #[serde(rename = "invitation.accept")]
    InvitationAccept,
    #[serde(rename = "invitation.cancel")]
    InvitationCancel,
    #[serde(rename = "invitation.expire")]
    InvitationExpire,

    // Membership lifecycle
    #[serde(rename = "member.deactivate")]
    MemberDeactivate,
    #[serde(rename = "member.reactivate")]
    MemberReactivate,
    #[serde(rename = "member.role_update")]
    MemberRoleUpdate,

    // Task cascades
    #[serde(rename = "tasks.revoke")]
    TasksRevoke,
    #[serde(rename = "tasks.transfer")]
    TasksTransfer,

    // Bulk operations
    #[serde(rename = "bulk.execute")]
    BulkExecute,
    #[serde(rename = "bulk.invite")]
    BulkInvite,
}

impl AuditAction {
    pub const ALL: [AuditAction; 11] = [
        AuditAction::InvitationIssue,
        AuditAction::InvitationAccept,
        AuditAction::InvitationCancel,
        AuditAction::InvitationExpire,
        AuditAction::MemberDeactivate,
        AuditAction::MemberReactivate,
        AuditAction::MemberRoleUpdate,
        AuditAction::TasksRevoke,
        AuditAction::TasksTransfer,
        AuditAction::BulkExecute,
        AuditAction::BulkInvite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::InvitationIssue => "invitation.issue",
            AuditAction::InvitationAccept => "invitation.accept",
            AuditAction::InvitationCancel => "invitation.cancel",
            AuditAction::InvitationExpire => "invitation.expire",
            AuditAction::MemberDeactivate => "member.deactivate",
            AuditAction::MemberReactivate => "member.reactivate",
            AuditAction::MemberRoleUpdate => "member.role_update",
            AuditAction::TasksRevoke => "tasks.revoke",
            AuditAction::TasksTransfer => "tasks.transfer",
            AuditAction::BulkExecute => "bulk.execute",
            AuditAction::BulkInvite => "bulk.invite",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .iter()
            .find(|a| a.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown audit action: {}", s))
    }
}

/// Result of an audited operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    /// Primary action committed but at least one cascade step failed.
    Degraded,
}

impl std::fmt::Display for AuditResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditResult::Success => "success",
            AuditResult::Degraded => "degraded",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AuditResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(AuditResult::Success),
            "degraded" => Ok(AuditResult::Degraded),
            _ => Err(format!("Unknown audit result: {}", s)),
        }
    }
}

/// An audit log entry representing a single membership mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier for this audit entry
    pub id: AuditLogId,
    /// When the action occurred
    pub timestamp: DateTime<Utc>,
    /// User that performed the action
    pub performed_by: UserId,
    /// User the action was aimed at, if any
    pub target_user_id: Option<UserId>,
    /// Partner the action happened in
    pub partner_id: PartnerId,
    /// The action that was performed
    pub action: AuditAction,
    /// Type of resource affected (e.g., "team_member", "invitation")
    pub resource_type: String,
    /// Identifier of the affected resource
    pub resource_id: String,
    /// Result of the operation
    pub result: AuditResult,
    /// Free-form reason supplied by the caller
    pub reason: Option<String>,
    /// Additional structured details (e.g., old/new role, counts)
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Create a new audit event builder
    pub fn builder(
        performed_by: &UserId,
        partner_id: &PartnerId,
        action: AuditAction,
    ) -> AuditEventBuilder {
        AuditEventBuilder::new(performed_by, partner_id, action)
    }
}

/// Builder for constructing audit events
pub struct AuditEventBuilder {
    performed_by: UserId,
    partner_id: PartnerId,
    action: AuditAction,
    target_user_id: Option<UserId>,
    resource_type: String,
    resource_id: String,
    result: AuditResult,
    reason: Option<String>,
    details: Option<serde_json::Value>,
}

impl AuditEventBuilder {
    pub fn new(performed_by: &UserId, partner_id: &PartnerId, action: AuditAction) -> Self {
        Self {
            performed_by: performed_by.clone(),
            partner_id: partner_id.clone(),
            action,
            target_user_id: None,
            resource_type: String::new(),
            resource_id: String::new(),
            result: AuditResult::Success,
            reason: None,
            details: None,
        }
    }

    pub fn target_user(mut self, user_id: Option<&UserId>) -> Self {
        self.target_user_id = user_id.cloned();
        self
    }

    pub fn resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = resource_type.into();
        self.resource_id = resource_id.into();
        self
    }

    pub fn result(mut self, result: AuditResult) -> Self {
        self.result = result;
        self
    }

    pub fn reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn build(self) -> AuditEvent {
        AuditEvent {
            id: AuditLogId::new(),
            timestamp: Utc::now(),
            performed_by: self.performed_by,
            target_user_id: self.target_user_id,
            partner_id: self.partner_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            result: self.result,
            reason: self.reason,
            details: self.details,
        }
    }
}

/// Filter for querying audit logs
#[derive(Clone, Debug, Default)]
pub struct AuditLogFilter {
    /// Filter by partner
    pub partner_id: Option<PartnerId>,
    /// Filter by performing user
    pub performed_by: Option<UserId>,
    /// Filter by target user
    pub target_user_id: Option<UserId>,
    /// Filter by action
    pub action: Option<AuditAction>,
    /// Filter by result
    pub result: Option<AuditResult>,
    /// Filter by start timestamp (inclusive)
    pub from: Option<DateTime<Utc>>,
    /// Filter by end timestamp (exclusive)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of results to return
    pub limit: Option<u32>,
    /// Number of results to skip (for pagination)
    pub offset: Option<u32>,
}

impl AuditLogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partner_id(mut self, partner_id: PartnerId) -> Self {
        self.partner_id = Some(partner_id);
        self
    }

    pub fn performed_by(mut self, user_id: UserId) -> Self {
        self.performed_by = Some(user_id);
        self
    }

    pub fn target_user_id(mut self, user_id: UserId) -> Self {
        self.target_user_id = Some(user_id);
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn result(mut self, result: AuditResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Error type for audit log operations
#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("database error: {0}")]
    Database(String),
}

/// Trait for audit log persistence.
///
/// Implementations append events and provide query capabilities
/// for compliance review.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record an audit event.
    ///
    /// Failures to record audit events should be logged but should not
    /// fail the main operation.
    async fn record(&self, event: AuditEvent) -> Result<(), AuditLogError>;

    /// Query audit logs with optional filters.
    ///
    /// Returns events matching the filter criteria, ordered by timestamp descending.
    async fn query(&self, filter: AuditLogFilter) -> Result<Vec<AuditEvent>, AuditLogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> UserId {
        UserId::from("admin1")
    }

    fn partner() -> PartnerId {
        PartnerId::from("P1")
    }

    #[test]
    fn test_audit_action_display() {
        assert_eq!(
            AuditAction::MemberDeactivate.to_string(),
            "member.deactivate"
        );
        assert_eq!(AuditAction::BulkExecute.to_string(), "bulk.execute");
    }

    #[test]
    fn test_audit_action_all_variants_roundtrip() {
        for action in AuditAction::ALL {
            let parsed: AuditAction = action.to_string().parse().unwrap();
            assert_eq!(action, parsed, "Roundtrip failed for {:?}", action);
        }
        assert!("member.delete".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_audit_result_parse_error() {
        let result = "unknown_result".parse::<AuditResult>();
        assert!(result.unwrap_err().contains("Unknown audit result"));
        assert_eq!(
            "degraded".parse::<AuditResult>().unwrap(),
            AuditResult::Degraded
        );
    }

    #[test]
    fn test_audit_event_builder() {
        let target = UserId::from("u9");
        let event = AuditEvent::builder(&admin(), &partner(), AuditAction::MemberDeactivate)
            .target_user(Some(&target))
            .resource("team_member", "u9")
            .reason(Some("left company".to_string()))
            .details(serde_json::json!({"tasks_revoked": 3}))
            .build();

        assert_eq!(event.performed_by, admin());
        assert_eq!(event.partner_id, partner());
        assert_eq!(event.target_user_id, Some(target));
        assert_eq!(event.resource_type, "team_member");
        assert_eq!(event.result, AuditResult::Success);
        assert_eq!(event.reason.as_deref(), Some("left company"));
        assert_eq!(event.details.unwrap()["tasks_revoked"], 3);
    }

    #[test]
    fn test_audit_event_builder_defaults() {
        let event =
            AuditEvent::builder(&admin(), &partner(), AuditAction::BulkExecute).build();
        assert!(event.target_user_id.is_none());
        assert!(event.reason.is_none());
        assert!(event.details.is_none());
    }

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::builder(&admin(), &partner(), AuditAction::InvitationIssue)
            .resource("invitation", "abc")
            .build();

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_audit_action_serde_matches_display() {
        let json = serde_json::to_string(&AuditAction::MemberRoleUpdate).unwrap();
        assert_eq!(json, "\"member.role_update\"");
        for action in AuditAction::ALL {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, serde_json::Value::String(action.as_str().to_string()));
            let back: AuditAction = serde_json::from_value(json).unwrap();
            assert_eq!(back, action);
        }
    }

    #[test]
    fn test_audit_log_filter_builder() {
        let filter = AuditLogFilter::new()
            .partner_id(partner())
            .target_user_id(UserId::from("u9"))
            .action(AuditAction::MemberReactivate)
            .limit(10)
            .offset(5);

        assert_eq!(filter.partner_id, Some(partner()));
        assert_eq!(filter.target_user_id, Some(UserId::from("u9")));
        assert_eq!(filter.action, Some(AuditAction::MemberReactivate));
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.offset, Some(5));
        assert!(filter.performed_by.is_none());
    }

    #[test]
    fn test_audit_log_id_is_v7() {
        let id = AuditLogId::new();
        assert_eq!(id.0.get_version_num(), 7);
        assert_ne!(id, AuditLogId::default());
    }

    #[test]
    fn test_audit_log_error_display() {
        let err = AuditLogError::Database("connection failed".to_string());
        assert!(err.to_string().contains("database error"));
        assert!(err.to_string().contains("connection failed"));
    }
}
