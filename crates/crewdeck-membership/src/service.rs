//! Entry point that wires the components over a set of backends.
//!
//! Every public operation returns an envelope ([`OperationResponse`] or
//! [`BulkResponse`]) rather than a bare `Result`, and is counted in
//! `crewdeck_membership_operations_total`.

use std::sync::Arc;

use crewdeck_audit::{AuditEvent, AuditLog, AuditLogFilter};
use crewdeck_identity::{IdentityClaims, IdentityProvider};
use crewdeck_notify::Notifier;
use crewdeck_storage::{
    InvitationId, InvitationStatus, MemberRole, MembershipStatus, PartnerId, Store, TenantId,
    UserId,
};
use serde::{Deserialize, Serialize};

use crate::audit::AuditLogger;
use crate::bulk::{BulkOperationCoordinator, BulkRequest};
use crate::checks;
use crate::claims::ClaimsSynchronizer;
use crate::config::MembershipConfig;
use crate::error::MembershipError;
use crate::invitations::{
    AcceptedInvitation, CancelledInvitation, InvitationCodeIssuer, InvitationList,
    InvitationPreview, InvitationRequest, Invitee, IssuedInvitation,
};
use crate::lifecycle::{
    Deactivated, MemberDetail, MemberList, MembershipLifecycleManager, Reactivated, RoleUpdated,
};
use crate::metrics;
use crate::notices::Notices;
use crate::response::{BulkResponse, OperationResponse, Outcome, Rejection};
use crate::tasks::{TaskCascadeReassigner, TasksTransferred};

/// The external collaborators the core runs against.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub audit: Arc<dyn AuditLog>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsView {
    pub user_id: UserId,
    pub claims: IdentityClaims,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntries {
    pub entries: Vec<AuditEvent>,
}

#[derive(Clone)]
pub struct MembershipService {
    invitations: InvitationCodeIssuer,
    lifecycle: MembershipLifecycleManager,
    claims: ClaimsSynchronizer,
    tasks: TaskCascadeReassigner,
    bulk: BulkOperationCoordinator,
    audit: AuditLogger,
}

impl MembershipService {
    pub fn new(backends: Backends, config: &MembershipConfig) -> Self {
        let audit = AuditLogger::new(backends.audit);
        let notices = Notices::new(backends.notifier);
        let claims = ClaimsSynchronizer::new(
            backends.store.clone(),
            backends.identity,
            config.claims_sync_attempts,
        );
        let tasks = TaskCascadeReassigner::new(
            backends.store.clone(),
            audit.clone(),
            notices.clone(),
            config.write_batch_limit,
        );
        let invitations = InvitationCodeIssuer::new(
            backends.store.clone(),
            claims.clone(),
            audit.clone(),
            notices.clone(),
            config,
        );
        let lifecycle = MembershipLifecycleManager::new(
            backends.store,
            invitations.clone(),
            claims.clone(),
            tasks.clone(),
            audit.clone(),
            notices,
        );
        let bulk = BulkOperationCoordinator::new(
            lifecycle.clone(),
            tasks.clone(),
            audit.clone(),
            config.bulk_max_items,
        );
        Self {
            invitations,
            lifecycle,
            claims,
            tasks,
            bulk,
            audit,
        }
    }

    fn respond<T>(
        operation: &'static str,
        result: Result<Outcome<T>, impl Into<Rejection>>,
        message: impl FnOnce(&T) -> String,
    ) -> OperationResponse<T> {
        let result = result.map_err(Into::<Rejection>::into);
        if let Err(r) = &result {
            if r.error.is_execution() {
                tracing::error!(operation, error = %r.error, "membership operation failed");
            } else {
                tracing::debug!(operation, error = %r.error, "membership operation rejected");
            }
        }
        let response = OperationResponse::from_result(result, message);
        metrics::record_operation(operation, response.outcome_label());
        response
    }

    fn respond_bulk(
        operation: &'static str,
        result: Result<BulkResponse, MembershipError>,
        dry_run: bool,
    ) -> BulkResponse {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(operation, error = %e, "bulk request refused");
                BulkResponse::aborted(&e, dry_run)
            }
        };
        let outcome = match (response.success, response.summary.failed) {
            (false, _) => "failure",
            (true, 0) => "success",
            (true, _) => "degraded",
        };
        metrics::record_operation(operation, outcome);
        response
    }

    // ─────────────────────────── Invitations ──────────────────────────────

    pub async fn generate_invitation_code(
        &self,
        phone_number: &str,
        name: &str,
        partner_id: &PartnerId,
        tenant_id: &TenantId,
        role: MemberRole,
        invited_by: &UserId,
    ) -> OperationResponse<IssuedInvitation> {
        let result = self
            .invitations
            .generate_invitation_code(phone_number, name, partner_id, tenant_id, role, invited_by)
            .await;
        Self::respond("generate_invitation_code", result, |i| {
            format!("Invitation code {} created for {}", i.code, i.partner_name)
        })
    }

    pub async fn issue_invitation(
        &self,
        request: InvitationRequest,
    ) -> OperationResponse<IssuedInvitation> {
        let result = self.invitations.issue_invitation(request).await;
        Self::respond("issue_invitation", result, |i| {
            format!("Invitation code {} created for {}", i.code, i.partner_name)
        })
    }

    pub async fn get_invitation_by_code(&self, code: &str) -> OperationResponse<InvitationPreview> {
        let result = self.invitations.get_invitation_by_code(code).await;
        Self::respond("get_invitation_by_code", result, |p| {
            format!("Invitation to join {} as {}", p.partner_name, p.role)
        })
    }

    pub async fn accept_invitation_by_code(
        &self,
        code: &str,
        phone_number: &str,
        user_id: &UserId,
    ) -> OperationResponse<AcceptedInvitation> {
        let result = self
            .invitations
            .accept_invitation_by_code(code, phone_number, user_id)
            .await;
        Self::respond("accept_invitation_by_code", result, |a| {
            format!("Joined {} as {}", a.partner_name, a.role)
        })
    }

    pub async fn cancel_invitation(
        &self,
        invitation_id: &InvitationId,
        partner_id: &PartnerId,
        cancelled_by: &UserId,
    ) -> OperationResponse<CancelledInvitation> {
        let result = self
            .invitations
            .cancel_invitation(invitation_id, partner_id, cancelled_by)
            .await;
        Self::respond("cancel_invitation", result, |c| {
            format!("Invitation {} cancelled", c.invitation_id)
        })
    }

    pub async fn invite_many(
        &self,
        partner_id: &PartnerId,
        tenant_id: &TenantId,
        invited_by: &UserId,
        invitees: Vec<Invitee>,
        expiry_hours: Option<u32>,
    ) -> BulkResponse {
        let result = self
            .invitations
            .invite_many(partner_id, tenant_id, invited_by, invitees, expiry_hours)
            .await;
        Self::respond_bulk("invite_many", result, false)
    }

    pub async fn list_invitations(
        &self,
        partner_id: &PartnerId,
        status: Option<InvitationStatus>,
    ) -> OperationResponse<InvitationList> {
        let result = self.invitations.list_invitations(partner_id, status).await;
        Self::respond("list_invitations", result, |l| {
            format!("{} invitations", l.invitations.len())
        })
    }

    // ───────────────────────────── Members ────────────────────────────────

    pub async fn get_team_member(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
    ) -> OperationResponse<MemberDetail> {
        let result = self.lifecycle.get_team_member(partner_id, user_id).await;
        Self::respond("get_team_member", result, |d| {
            format!("{} ({}, {})", d.member.name, d.member.role, d.member.status)
        })
    }

    pub async fn list_team_members(
        &self,
        partner_id: &PartnerId,
        status: Option<MembershipStatus>,
    ) -> OperationResponse<MemberList> {
        let result = self.lifecycle.list_team_members(partner_id, status).await;
        Self::respond("list_team_members", result, |l| {
            format!("{} members", l.members.len())
        })
    }

    pub async fn deactivate_team_member(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
        deactivated_by: &UserId,
        reason: Option<String>,
    ) -> OperationResponse<Deactivated> {
        let result = self
            .lifecycle
            .deactivate_team_member(partner_id, user_id, deactivated_by, reason)
            .await;
        Self::respond("deactivate_team_member", result, |d| {
            format!(
                "Member {} deactivated; {} tasks revoked. A new invitation code is required to rejoin",
                d.user_id, d.tasks_revoked
            )
        })
    }

    pub async fn reactivate_team_member(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
        reactivated_by: &UserId,
        invitation_code: Option<&str>,
    ) -> OperationResponse<Reactivated> {
        let result = self
            .lifecycle
            .reactivate_team_member(partner_id, user_id, reactivated_by, invitation_code)
            .await;
        Self::respond("reactivate_team_member", result, |r| {
            format!("Member {} reactivated as {}", r.user_id, r.role)
        })
    }

    /// `new_role` is the wire form (`partner_admin` or `employee`).
    pub async fn update_team_member_role(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
        new_role: &str,
        performed_by: &UserId,
    ) -> OperationResponse<RoleUpdated> {
        let result = match checks::parse_role(new_role) {
            Ok(role) => {
                self.lifecycle
                    .update_team_member_role(partner_id, user_id, role, performed_by)
                    .await
            }
            Err(e) => Err(e),
        };
        Self::respond("update_team_member_role", result, |r| {
            if r.previous_role == r.new_role {
                format!("Member {} already has role {}", r.user_id, r.new_role)
            } else {
                format!(
                    "Member {} role changed from {} to {}",
                    r.user_id, r.previous_role, r.new_role
                )
            }
        })
    }

    // ────────────────────────────── Tasks ─────────────────────────────────

    pub async fn transfer_user_tasks(
        &self,
        partner_id: &PartnerId,
        from_user_id: &UserId,
        to_user_id: &UserId,
        performed_by: &UserId,
    ) -> OperationResponse<TasksTransferred> {
        let result = self
            .tasks
            .transfer_user_tasks(partner_id, from_user_id, to_user_id, performed_by)
            .await;
        Self::respond("transfer_user_tasks", result, |t| {
            format!(
                "{} tasks transferred from {} to {}",
                t.transferred, t.from_user_id, t.to_user_id
            )
        })
    }

    // ─────────────────────────────── Bulk ─────────────────────────────────

    pub async fn execute_bulk(&self, request: BulkRequest) -> BulkResponse {
        let dry_run = request.dry_run;
        let result = self.bulk.run(request).await;
        Self::respond_bulk("execute_bulk", result, dry_run)
    }

    // ───────────────────────────── Claims ─────────────────────────────────

    pub async fn get_claims(&self, user_id: &UserId) -> OperationResponse<ClaimsView> {
        let result = self.claims.current(user_id).await.map(|claims| {
            Outcome::new(ClaimsView {
                user_id: user_id.clone(),
                claims,
            })
        });
        Self::respond("get_claims", result, |v| {
            format!("Claims for {}", v.user_id)
        })
    }

    /// Rebuild a user's claims from their active memberships.
    pub async fn reconcile_claims(&self, user_id: &UserId) -> OperationResponse<ClaimsView> {
        let result = self.claims.reconcile(user_id).await.map(|claims| {
            Outcome::new(ClaimsView {
                user_id: user_id.clone(),
                claims,
            })
        });
        Self::respond("reconcile_claims", result, |v| {
            format!(
                "Claims for {} reconciled: {} active memberships",
                v.user_id,
                v.claims.partner_ids.len()
            )
        })
    }

    // ────────────────────────────── Audit ─────────────────────────────────

    pub async fn query_audit(
        &self,
        partner_id: &PartnerId,
        filter: AuditLogFilter,
    ) -> OperationResponse<AuditEntries> {
        let result = self
            .audit
            .query(partner_id, filter)
            .await
            .map(|entries| Outcome::new(AuditEntries { entries }));
        Self::respond("query_audit", result, |a| {
            format!("{} audit entries", a.entries.len())
        })
    }
}
