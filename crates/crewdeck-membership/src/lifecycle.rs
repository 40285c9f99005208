//! Membership state machine: suspend, reactivate, change role.
//!
//! Each operation commits the member and link changes as one batch, then runs
//! claims sync, task revocation, audit and notification as best-effort steps.
//! A failing step never undoes the committed change; it is reported back as a
//! [`CascadeFailure`].

use std::sync::Arc;

use chrono::Utc;
use crewdeck_audit::{AuditAction, AuditEvent, AuditResult};
use crewdeck_notify::{NoticeKind, Recipient};
use crewdeck_storage::{
    InvitationCode, MemberRole, MembershipStatus, PartnerId, Store, TeamMember, UserId,
    WorkspaceLink, WriteBatch,
};
use serde::{Deserialize, Serialize};

use crate::audit::AuditLogger;
use crate::checks;
use crate::claims::ClaimsSynchronizer;
use crate::error::MembershipError;
use crate::invitations::InvitationCodeIssuer;
use crate::metrics;
use crate::notices::Notices;
use crate::response::{CascadeFailure, CascadeStep, Outcome, Rejection};
use crate::tasks::TaskCascadeReassigner;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deactivated {
    pub partner_id: PartnerId,
    pub user_id: UserId,
    /// Coming back requires a fresh invitation code.
    pub requires_new_invitation: bool,
    pub tasks_revoked: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reactivated {
    pub partner_id: PartnerId,
    pub user_id: UserId,
    pub role: MemberRole,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdated {
    pub partner_id: PartnerId,
    pub user_id: UserId,
    pub previous_role: MemberRole,
    pub new_role: MemberRole,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberList {
    pub members: Vec<TeamMember>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberDetail {
    pub member: TeamMember,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<WorkspaceLink>,
}

fn claims_failure(user_id: &UserId, e: MembershipError) -> CascadeFailure {
    tracing::warn!(user_id = %user_id, error = %e, "claims sync failed");
    metrics::record_cascade_failure(CascadeStep::ClaimsSync.as_str());
    CascadeFailure {
        step: CascadeStep::ClaimsSync,
        message: e.to_string(),
    }
}

#[derive(Clone)]
pub struct MembershipLifecycleManager {
    store: Arc<dyn Store>,
    invitations: InvitationCodeIssuer,
    claims: ClaimsSynchronizer,
    tasks: TaskCascadeReassigner,
    audit: AuditLogger,
    notices: Notices,
}

impl MembershipLifecycleManager {
    pub fn new(
        store: Arc<dyn Store>,
        invitations: InvitationCodeIssuer,
        claims: ClaimsSynchronizer,
        tasks: TaskCascadeReassigner,
        audit: AuditLogger,
        notices: Notices,
    ) -> Self {
        Self {
            store,
            invitations,
            claims,
            tasks,
            audit,
            notices,
        }
    }

    // ───────────────────────────── Reads ──────────────────────────────────

    pub async fn get_team_member(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
    ) -> Result<Outcome<MemberDetail>, MembershipError> {
        let member = checks::load_membership(self.store.as_ref(), partner_id, user_id).await?;
        let link = checks::find_link(self.store.as_ref(), user_id, partner_id).await?;
        Ok(Outcome::new(MemberDetail { member, link }))
    }

    pub async fn list_team_members(
        &self,
        partner_id: &PartnerId,
        status: Option<MembershipStatus>,
    ) -> Result<Outcome<MemberList>, MembershipError> {
        let members = self.store.list_team_members(partner_id, status).await?;
        Ok(Outcome::new(MemberList { members }))
    }

    // ───────────────────────────── Checks ─────────────────────────────────

    /// Everything `deactivate_team_member` verifies before writing.
    pub async fn check_deactivate(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
        deactivated_by: &UserId,
    ) -> Result<TeamMember, MembershipError> {
        checks::ensure_not_self(deactivated_by, user_id, "deactivate")?;
        let member = checks::load_membership(self.store.as_ref(), partner_id, user_id).await?;
        checks::ensure_active(&member)?;
        Ok(member)
    }

    /// Everything `reactivate_team_member` verifies before writing, except
    /// expiry of the code.
    pub async fn check_reactivate(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
        invitation_code: Option<&str>,
    ) -> Result<(TeamMember, InvitationCode), MembershipError> {
        let code = checks::require(invitation_code, "invitation code")?;
        let member = checks::load_membership(self.store.as_ref(), partner_id, user_id).await?;
        checks::ensure_suspended(&member)?;
        let invitation = self.invitations.find_pending(code).await?;
        checks::ensure_code_for_partner(&invitation, partner_id)?;
        Ok((member, invitation))
    }

    pub async fn check_role_update(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
        performed_by: &UserId,
    ) -> Result<TeamMember, MembershipError> {
        checks::ensure_not_self(performed_by, user_id, "change the role of")?;
        checks::load_membership(self.store.as_ref(), partner_id, user_id).await
    }

    // ─────────────────────────── Transitions ──────────────────────────────

    pub async fn deactivate_team_member(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
        deactivated_by: &UserId,
        reason: Option<String>,
    ) -> Result<Outcome<Deactivated>, MembershipError> {
        let mut member = self
            .check_deactivate(partner_id, user_id, deactivated_by)
            .await?;
        let link = checks::find_link(self.store.as_ref(), user_id, partner_id).await?;

        let now = Utc::now();
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        member.suspend(deactivated_by, reason.clone(), now);
        let mut batch = WriteBatch::new().put_team_member(member);
        if let Some(mut link) = link {
            link.status = MembershipStatus::Suspended;
            link.suspended_at = Some(now);
            link.updated_at = now;
            batch = batch.put_workspace_link(link);
        }
        self.store.commit(batch).await?;
        tracing::info!(
            partner_id = %partner_id,
            user_id = %user_id,
            by = %deactivated_by,
            "member suspended"
        );

        let mut failures = Vec::new();
        if let Err(e) = self.claims.on_removed(user_id, partner_id).await {
            failures.push(claims_failure(user_id, e));
        }

        let revocation_reason = reason
            .clone()
            .unwrap_or_else(|| "member deactivated".to_string());
        let tasks_revoked = match self
            .tasks
            .revoke_user_tasks(partner_id, user_id, deactivated_by, &revocation_reason)
            .await
        {
            Ok(revoked) => {
                failures.extend(revoked.failures);
                revoked.value
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "task revocation failed");
                metrics::record_cascade_failure(CascadeStep::TaskRevocation.as_str());
                failures.push(CascadeFailure {
                    step: CascadeStep::TaskRevocation,
                    message: e.to_string(),
                });
                0
            }
        };

        let result = if failures.is_empty() {
            AuditResult::Success
        } else {
            AuditResult::Degraded
        };
        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(deactivated_by, partner_id, AuditAction::MemberDeactivate)
                    .target_user(Some(user_id))
                    .resource("team_member", user_id.as_str())
                    .result(result)
                    .reason(reason.clone())
                    .details(serde_json::json!({
                        "tasksRevoked": tasks_revoked,
                        "failedSteps": failures.iter().map(|f| f.step).collect::<Vec<_>>(),
                    }))
                    .build(),
            )
            .await
        {
            failures.push(f);
        }
        if let Err(f) = self
            .notices
            .send(
                NoticeKind::MemberDeactivated,
                partner_id,
                vec![Recipient::User(user_id.clone())],
                serde_json::json!({ "reason": reason }),
            )
            .await
        {
            failures.push(f);
        }

        Ok(Outcome::with_failures(
            Deactivated {
                partner_id: partner_id.clone(),
                user_id: user_id.clone(),
                requires_new_invitation: true,
                tasks_revoked,
            },
            failures,
        ))
    }

    /// Restore a suspended member using a fresh invitation code.
    ///
    /// The code must be pending for this partner but need not have been issued
    /// to the member's phone number.
    pub async fn reactivate_team_member(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
        reactivated_by: &UserId,
        invitation_code: Option<&str>,
    ) -> Result<Outcome<Reactivated>, Rejection> {
        let (mut member, mut invitation) = self
            .check_reactivate(partner_id, user_id, invitation_code)
            .await?;
        let now = Utc::now();
        if invitation.is_expired_at(now) {
            let failures = self.invitations.expire(invitation).await?;
            return Err(Rejection {
                error: MembershipError::CodeExpired,
                failures,
            });
        }

        member.reactivate(reactivated_by, now);
        let role = member.role;
        let link = match checks::find_link(self.store.as_ref(), user_id, partner_id).await? {
            Some(mut link) => {
                link.status = MembershipStatus::Active;
                link.suspended_at = None;
                link.updated_at = now;
                link
            }
            None => WorkspaceLink {
                user_id: user_id.clone(),
                partner_id: partner_id.clone(),
                tenant_id: invitation.tenant_id.clone(),
                role,
                status: MembershipStatus::Active,
                permissions: role.default_permissions(),
                joined_at: now,
                suspended_at: None,
                updated_at: now,
            },
        };
        invitation.accept(user_id, now);

        self.store
            .commit(
                WriteBatch::new()
                    .put_team_member(member)
                    .put_workspace_link(link.clone())
                    .put_invitation(invitation.clone()),
            )
            .await?;
        tracing::info!(
            partner_id = %partner_id,
            user_id = %user_id,
            by = %reactivated_by,
            "member reactivated"
        );

        let mut failures = Vec::new();
        if let Err(e) = self.claims.on_added(&link).await {
            failures.push(claims_failure(user_id, e));
        }
        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(reactivated_by, partner_id, AuditAction::MemberReactivate)
                    .target_user(Some(user_id))
                    .resource("team_member", user_id.as_str())
                    .result(if failures.is_empty() {
                        AuditResult::Success
                    } else {
                        AuditResult::Degraded
                    })
                    .details(serde_json::json!({ "invitationId": invitation.id.to_string() }))
                    .build(),
            )
            .await
        {
            failures.push(f);
        }
        if let Err(f) = self
            .notices
            .send(
                NoticeKind::MemberReactivated,
                partner_id,
                vec![Recipient::User(user_id.clone())],
                serde_json::json!({ "role": role }),
            )
            .await
        {
            failures.push(f);
        }

        Ok(Outcome::with_failures(
            Reactivated {
                partner_id: partner_id.clone(),
                user_id: user_id.clone(),
                role,
            },
            failures,
        ))
    }

    pub async fn update_team_member_role(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
        new_role: MemberRole,
        performed_by: &UserId,
    ) -> Result<Outcome<RoleUpdated>, MembershipError> {
        let mut member = self
            .check_role_update(partner_id, user_id, performed_by)
            .await?;
        let previous_role = member.role;
        let updated = RoleUpdated {
            partner_id: partner_id.clone(),
            user_id: user_id.clone(),
            previous_role,
            new_role,
        };
        if previous_role == new_role {
            return Ok(Outcome::new(updated));
        }

        let now = Utc::now();
        member.role = new_role;
        member.updated_at = now;
        let mut batch = WriteBatch::new().put_team_member(member);
        let link = checks::find_link(self.store.as_ref(), user_id, partner_id).await?;
        let link = link.map(|mut link| {
            link.role = new_role;
            link.permissions = new_role.default_permissions();
            link.updated_at = now;
            link
        });
        if let Some(link) = &link {
            batch = batch.put_workspace_link(link.clone());
        }
        self.store.commit(batch).await?;
        tracing::info!(
            partner_id = %partner_id,
            user_id = %user_id,
            from = %previous_role,
            to = %new_role,
            "member role updated"
        );

        let mut failures = Vec::new();
        if let Some(link) = &link {
            if let Err(e) = self.claims.on_role_changed(link).await {
                failures.push(claims_failure(user_id, e));
            }
        }
        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(performed_by, partner_id, AuditAction::MemberRoleUpdate)
                    .target_user(Some(user_id))
                    .resource("team_member", user_id.as_str())
                    .details(serde_json::json!({
                        "previousRole": previous_role,
                        "newRole": new_role,
                    }))
                    .build(),
            )
            .await
        {
            failures.push(f);
        }
        if let Err(f) = self
            .notices
            .send(
                NoticeKind::RoleChanged,
                partner_id,
                vec![Recipient::User(user_id.clone())],
                serde_json::json!({ "previousRole": previous_role, "newRole": new_role }),
            )
            .await
        {
            failures.push(f);
        }

        Ok(Outcome::with_failures(updated, failures))
    }
}
