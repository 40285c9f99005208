//! Keeps identity-provider claims in line with a user's active workspace links.
//!
//! Every write recomputes `partner_ids` from the store, applies the
//! change-specific rule, and then repairs the active selection:
//! an active partner that is no longer an active membership is replaced by the
//! lexicographically smallest remaining one, or cleared when none remain.
//! Writes carry the version they were derived from; a version conflict causes
//! a re-read and re-apply, up to the configured number of attempts.

use std::sync::Arc;

use crewdeck_identity::{IdentityClaims, IdentityError, IdentityProvider};
use crewdeck_storage::{MembershipStatus, PartnerId, Store, UserId, WorkspaceLink};

use crate::error::MembershipError;
use crate::metrics;

/// What happened to a user's memberships.
#[derive(Clone, Debug)]
pub enum ClaimsChange<'a> {
    /// Invitation accepted or membership reactivated.
    Added(&'a WorkspaceLink),
    /// Membership suspended.
    Removed(&'a PartnerId),
    /// Role changed on an existing link.
    RoleChanged(&'a WorkspaceLink),
    /// No specific change; recompute from the store.
    Reconcile,
}

#[derive(Clone)]
pub struct ClaimsSynchronizer {
    store: Arc<dyn Store>,
    identity: Arc<dyn IdentityProvider>,
    max_attempts: u32,
}

impl ClaimsSynchronizer {
    pub fn new(
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            identity,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn on_added(
        &self,
        link: &WorkspaceLink,
    ) -> Result<IdentityClaims, MembershipError> {
        self.apply(&link.user_id, ClaimsChange::Added(link)).await
    }

    pub async fn on_removed(
        &self,
        user_id: &UserId,
        partner_id: &PartnerId,
    ) -> Result<IdentityClaims, MembershipError> {
        self.apply(user_id, ClaimsChange::Removed(partner_id)).await
    }

    pub async fn on_role_changed(
        &self,
        link: &WorkspaceLink,
    ) -> Result<IdentityClaims, MembershipError> {
        self.apply(&link.user_id, ClaimsChange::RoleChanged(link))
            .await
    }

    /// Recompute a user's claims from their active links.
    pub async fn reconcile(&self, user_id: &UserId) -> Result<IdentityClaims, MembershipError> {
        self.apply(user_id, ClaimsChange::Reconcile).await
    }

    /// Current claims as the identity provider holds them.
    pub async fn current(&self, user_id: &UserId) -> Result<IdentityClaims, MembershipError> {
        Ok(self.identity.get_claims(user_id).await?.claims)
    }

    async fn apply(
        &self,
        user_id: &UserId,
        change: ClaimsChange<'_>,
    ) -> Result<IdentityClaims, MembershipError> {
        for attempt in 1..=self.max_attempts {
            let current = self.identity.get_claims(user_id).await?;
            let links = self
                .store
                .list_workspace_links(user_id, Some(MembershipStatus::Active))
                .await
                .map_err(|e| MembershipError::ClaimsSyncFailed(e.to_string()))?;

            let next = derive_claims(current.claims.clone(), &links, &change);
            if next == current.claims {
                return Ok(next);
            }

            match self
                .identity
                .set_claims(user_id, next.clone(), Some(current.version))
                .await
            {
                Ok(version) => {
                    tracing::debug!(
                        user_id = %user_id,
                        version,
                        partners = next.partner_ids.len(),
                        "claims updated"
                    );
                    return Ok(next);
                }
                Err(IdentityError::Conflict { expected, actual }) if attempt < self.max_attempts => {
                    metrics::record_claims_conflict();
                    tracing::warn!(
                        user_id = %user_id,
                        attempt,
                        expected,
                        actual,
                        "claims changed concurrently, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(MembershipError::ClaimsSyncFailed(format!(
            "gave up after {} conflicting attempts",
            self.max_attempts
        )))
    }
}

/// Apply a membership change to a claims value. `active_links` must be the
/// user's currently active links, ordered by partner id.
pub fn derive_claims(
    mut claims: IdentityClaims,
    active_links: &[WorkspaceLink],
    change: &ClaimsChange<'_>,
) -> IdentityClaims {
    claims.partner_ids = active_links.iter().map(|l| l.partner_id.clone()).collect();

    match change {
        ClaimsChange::Added(link) => {
            claims.partner_ids.insert(link.partner_id.clone());
            if claims.active_partner_id.is_none() {
                claims.set_active(&link.partner_id, &link.tenant_id, link.role);
            }
        }
        ClaimsChange::Removed(partner_id) => {
            claims.partner_ids.remove(*partner_id);
        }
        ClaimsChange::RoleChanged(link) => {
            let applies = claims.is_active_partner(&link.partner_id)
                || claims.active_partner_id.is_none();
            if applies && claims.partner_ids.contains(&link.partner_id) {
                claims.role = Some(link.role.as_str().to_string());
            }
        }
        ClaimsChange::Reconcile => {
            let current = claims.active_partner_id.clone();
            if let Some(active) =
                current.and_then(|p| active_links.iter().find(|l| l.partner_id == p))
            {
                claims.set_active(&active.partner_id, &active.tenant_id, active.role);
            }
        }
    }

    let active_is_valid = claims
        .active_partner_id
        .as_ref()
        .is_some_and(|p| claims.partner_ids.contains(p));
    if !active_is_valid {
        let fallback = active_links
            .iter()
            .filter(|l| claims.partner_ids.contains(&l.partner_id))
            .min_by(|a, b| a.partner_id.cmp(&b.partner_id));
        match fallback {
            Some(link) => claims.set_active(&link.partner_id, &link.tenant_id, link.role),
            None => claims.clear_active(),
        }
    }

    claims
}
