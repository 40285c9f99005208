//! Identity provider abstraction for crewdeck.
//!
//! The identity provider holds per-user authorization claims that every
//! authenticated request elsewhere in the product consults. Writes are full
//! replaces, so callers must merge first; the membership core does that in
//! one place (its claims synchronizer) using [`IdentityClaims`].

use async_trait::async_trait;
use crewdeck_storage::{MemberRole, PartnerId, TenantId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Authorization claims for one user.
///
/// Keys this crate doesn't know about are kept in `extra` and written back
/// untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_partner_id: Option<PartnerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tenant_id: Option<TenantId>,
    /// Every partner the user currently holds an active membership in.
    #[serde(default)]
    pub partner_ids: BTreeSet<PartnerId>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl IdentityClaims {
    pub fn has_partner(&self, partner_id: &PartnerId) -> bool {
        self.partner_ids.contains(partner_id)
    }

    pub fn is_active_partner(&self, partner_id: &PartnerId) -> bool {
        self.active_partner_id.as_ref() == Some(partner_id)
    }

    /// Point the active selection at a membership.
    pub fn set_active(&mut self, partner_id: &PartnerId, tenant_id: &TenantId, role: MemberRole) {
        self.active_partner_id = Some(partner_id.clone());
        self.active_tenant_id = Some(tenant_id.clone());
        self.tenant_id = Some(tenant_id.clone());
        self.role = Some(role.as_str().to_string());
    }

    /// Drop the active selection along with the role/tenant derived from it.
    pub fn clear_active(&mut self) {
        self.active_partner_id = None;
        self.active_tenant_id = None;
        self.tenant_id = None;
        self.role = None;
    }
}

/// Claims plus the provider's version counter (0 = never written).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VersionedClaims {
    pub claims: IdentityClaims,
    pub version: u64,
}

/// Error type for identity provider operations
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The claims changed since they were read.
    #[error("claims version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("identity provider error: {0}")]
    Backend(String),
}

/// Identity provider holding per-user claims.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Read a user's claims. Users without claims yield the default at version 0.
    async fn get_claims(&self, user_id: &UserId) -> Result<VersionedClaims, IdentityError>;

    /// Replace a user's claims, returning the new version.
    ///
    /// When `expected_version` is set and no longer current, fails with
    /// [`IdentityError::Conflict`] and writes nothing.
    async fn set_claims(
        &self,
        user_id: &UserId,
        claims: IdentityClaims,
        expected_version: Option<u64>,
    ) -> Result<u64, IdentityError>;
}
