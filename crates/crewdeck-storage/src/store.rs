//! The Store trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The persistence gateway the membership core depends on.
///
/// Reads are collection-scoped lookups and predicate queries; all writes go
/// through [`Store::commit`], which applies a [`WriteBatch`] atomically.
/// There is no cross-call atomicity.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Writes ─────────────────────────────────────────

    /// Apply every op in the batch, or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    // ───────────────────────────────────── Partners ───────────────────────────────────────

    /// Get partner by ID.
    async fn get_partner(&self, partner_id: &PartnerId) -> Result<Partner, StoreError>;

    // ───────────────────────────────────── Team Members ───────────────────────────────────

    /// Get the team member record for a user within a partner.
    async fn get_team_member(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
    ) -> Result<TeamMember, StoreError>;

    /// List every team member record a user holds, across partners.
    async fn list_memberships_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<TeamMember>, StoreError>;

    /// List team members of a partner, optionally filtered by status.
    async fn list_team_members(
        &self,
        partner_id: &PartnerId,
        status: Option<MembershipStatus>,
    ) -> Result<Vec<TeamMember>, StoreError>;

    // ───────────────────────────────────── Workspace Links ────────────────────────────────

    /// Get the workspace link for a (user, partner) pair.
    async fn get_workspace_link(
        &self,
        user_id: &UserId,
        partner_id: &PartnerId,
    ) -> Result<WorkspaceLink, StoreError>;

    /// List a user's workspace links ordered by partner ID, optionally filtered by status.
    async fn list_workspace_links(
        &self,
        user_id: &UserId,
        status: Option<MembershipStatus>,
    ) -> Result<Vec<WorkspaceLink>, StoreError>;

    // ───────────────────────────────────── Invitations ────────────────────────────────────

    /// Get invitation by ID.
    async fn get_invitation(&self, id: &InvitationId) -> Result<InvitationCode, StoreError>;

    /// Find the pending invitation carrying exactly this code, if any.
    async fn find_pending_invitation_by_code(
        &self,
        code: &str,
    ) -> Result<Option<InvitationCode>, StoreError>;

    /// Pending invitations for a (phone, partner) pair. Normally zero or one.
    async fn list_pending_invitations_for_phone(
        &self,
        phone_number: &str,
        partner_id: &PartnerId,
    ) -> Result<Vec<InvitationCode>, StoreError>;

    /// List a partner's invitations, newest first, optionally filtered by status.
    async fn list_invitations(
        &self,
        partner_id: &PartnerId,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<InvitationCode>, StoreError>;

    // ───────────────────────────────────── Tasks ──────────────────────────────────────────

    /// Get task by ID.
    async fn get_task(&self, task_id: &TaskId) -> Result<Task, StoreError>;

    /// List a partner's tasks, optionally narrowed to one assignee and a set of statuses
    /// (an empty status list means any status).
    async fn list_tasks(
        &self,
        partner_id: &PartnerId,
        assignee: Option<UserId>,
        statuses: Vec<TaskStatus>,
    ) -> Result<Vec<Task>, StoreError>;
}
