//! Invitation codes: issuance, preview, acceptance and cancellation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use crewdeck_audit::{AuditAction, AuditEvent};
use crewdeck_notify::{NoticeKind, Recipient};
use crewdeck_storage::{
    InvitationCode, InvitationId, InvitationStatus, MemberRole, MembershipStatus, PartnerId,
    Store, StoreError, TeamMember, TenantId, UserId, WorkspaceLink, WriteBatch,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::audit::AuditLogger;
use crate::checks;
use crate::claims::ClaimsSynchronizer;
use crate::config::{MembershipConfig, MAX_INVITE_EXPIRY_HOURS};
use crate::error::MembershipError;
use crate::metrics;
use crate::notices::Notices;
use crate::response::{
    BulkItemResult, BulkResponse, BulkSummary, CascadeFailure, CascadeStep, Outcome, Rejection,
};

/// Uppercase letters and digits minus the easily confused `I`, `O` and `0`.
pub const CODE_ALPHABET: &[u8; 33] = b"ABCDEFGHJKLMNPQRSTUVWXYZ123456789";
pub const CODE_LENGTH: usize = 8;
/// Lifetime of codes issued through the code path.
pub const CODE_TTL_DAYS: i64 = 7;

/// How long an invitation stays valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationExpiry {
    /// The fixed seven-day window of code-based invitations.
    Code,
    /// Bulk/email issuance, 1 to 720 hours.
    Hours(u32),
}

impl InvitationExpiry {
    fn duration(&self) -> Result<Duration, MembershipError> {
        match self {
            InvitationExpiry::Code => Ok(Duration::days(CODE_TTL_DAYS)),
            InvitationExpiry::Hours(h) if (1..=MAX_INVITE_EXPIRY_HOURS).contains(h) => {
                Ok(Duration::hours(i64::from(*h)))
            }
            InvitationExpiry::Hours(h) => Err(MembershipError::validation(format!(
                "expiry must be between 1 and {MAX_INVITE_EXPIRY_HOURS} hours, got {h}"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct InvitationRequest {
    pub phone_number: String,
    pub name: String,
    pub partner_id: PartnerId,
    pub tenant_id: TenantId,
    pub role: MemberRole,
    pub invited_by: UserId,
    pub expiry: InvitationExpiry,
}

/// One invitee of a bulk issuance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitee {
    pub phone_number: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: MemberRole,
}

fn default_role() -> MemberRole {
    MemberRole::Employee
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedInvitation {
    pub invitation_id: InvitationId,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub partner_name: String,
}

/// What a code grants, without changing anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationPreview {
    pub code: String,
    pub partner_id: PartnerId,
    pub partner_name: String,
    pub name: String,
    pub role: MemberRole,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedInvitation {
    pub partner_id: PartnerId,
    pub partner_name: String,
    pub tenant_id: TenantId,
    pub role: MemberRole,
    pub active_partner_id: Option<PartnerId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledInvitation {
    pub invitation_id: InvitationId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvitationList {
    pub invitations: Vec<InvitationCode>,
}

/// Draw a fresh code from [`CODE_ALPHABET`].
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[derive(Clone)]
pub struct InvitationCodeIssuer {
    store: Arc<dyn Store>,
    claims: ClaimsSynchronizer,
    audit: AuditLogger,
    notices: Notices,
    generation_attempts: u32,
    default_expiry_hours: u32,
    bulk_max_items: usize,
}

impl InvitationCodeIssuer {
    pub fn new(
        store: Arc<dyn Store>,
        claims: ClaimsSynchronizer,
        audit: AuditLogger,
        notices: Notices,
        config: &MembershipConfig,
    ) -> Self {
        Self {
            store,
            claims,
            audit,
            notices,
            generation_attempts: config.code_generation_attempts.max(1),
            default_expiry_hours: config.invite_expiry_hours,
            bulk_max_items: config.bulk_max_items,
        }
    }

    /// Issue a seven-day code for one phone number.
    pub async fn generate_invitation_code(
        &self,
        phone_number: &str,
        name: &str,
        partner_id: &PartnerId,
        tenant_id: &TenantId,
        role: MemberRole,
        invited_by: &UserId,
    ) -> Result<Outcome<IssuedInvitation>, MembershipError> {
        self.issue_invitation(InvitationRequest {
            phone_number: phone_number.to_string(),
            name: name.to_string(),
            partner_id: partner_id.clone(),
            tenant_id: tenant_id.clone(),
            role,
            invited_by: invited_by.clone(),
            expiry: InvitationExpiry::Code,
        })
        .await
    }

    /// Issue an invitation, superseding any pending one for the same
    /// (phone, partner) pair.
    pub async fn issue_invitation(
        &self,
        request: InvitationRequest,
    ) -> Result<Outcome<IssuedInvitation>, MembershipError> {
        let phone_number = checks::normalize_phone(&request.phone_number)?;
        let name = checks::validate_name(&request.name)?;
        let ttl = request.expiry.duration()?;

        let partner = match self.store.get_partner(&request.partner_id).await {
            Ok(partner) => partner,
            Err(StoreError::NotFound) => return Err(MembershipError::NotFound("partner")),
            Err(e) => return Err(e.into()),
        };
        let inviter = match self
            .store
            .get_team_member(&request.partner_id, &request.invited_by)
            .await
        {
            Ok(member) => Some(member),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        let mut invitation = InvitationCode {
            id: InvitationId::new(),
            code: String::new(),
            phone_number: phone_number.clone(),
            name,
            partner_id: request.partner_id.clone(),
            tenant_id: request.tenant_id.clone(),
            role: request.role,
            invited_by: request.invited_by.clone(),
            status: InvitationStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
            accepted_by: None,
            accepted_at: None,
            resolved_by: None,
            resolved_at: None,
        };

        let mut committed = None;
        for attempt in 1..=self.generation_attempts {
            let code = generate_code();
            if self.store.find_pending_invitation_by_code(&code).await?.is_some() {
                metrics::record_code_collision();
                tracing::debug!(attempt, "invitation code collision");
                continue;
            }
            invitation.code = code;

            // Re-read every attempt: a concurrent issuance for the same pair
            // may have committed since the last one.
            let mut superseded = self
                .store
                .list_pending_invitations_for_phone(&phone_number, &request.partner_id)
                .await?;
            let mut batch = WriteBatch::new();
            for prior in &mut superseded {
                prior.close(InvitationStatus::Cancelled, Some(&request.invited_by), now);
                batch = batch.put_invitation(prior.clone());
            }
            batch = batch.put_invitation(invitation.clone());

            match self.store.commit(batch).await {
                Ok(()) => {
                    committed = Some(superseded);
                    break;
                }
                Err(StoreError::AlreadyExists) => {
                    if self
                        .store
                        .find_pending_invitation_by_code(&invitation.code)
                        .await?
                        .is_some()
                    {
                        metrics::record_code_collision();
                        tracing::debug!(attempt, "invitation code taken at commit");
                    } else {
                        tracing::debug!(
                            attempt,
                            partner_id = %request.partner_id,
                            "concurrent invitation for the same phone; superseding it"
                        );
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        let Some(superseded) = committed else {
            return Err(MembershipError::GenerationExhausted(self.generation_attempts));
        };

        tracing::info!(
            partner_id = %invitation.partner_id,
            invitation_id = %invitation.id,
            superseded = superseded.len(),
            "invitation issued"
        );

        let mut failures = Vec::new();
        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(&request.invited_by, &request.partner_id, AuditAction::InvitationIssue)
                    .resource("invitation", invitation.id.to_string())
                    .details(serde_json::json!({
                        "role": invitation.role,
                        "expiresAt": invitation.expires_at,
                        "superseded": superseded.iter().map(|p| p.id.to_string()).collect::<Vec<_>>(),
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
                NoticeKind::InvitationIssued,
                &request.partner_id,
                vec![Recipient::Phone(phone_number)],
                serde_json::json!({
                    "code": invitation.code,
                    "name": invitation.name,
                    "partnerName": partner.name,
                    "invitedBy": inviter.as_ref().map(|m| m.name.as_str()),
                    "expiresAt": invitation.expires_at,
                }),
            )
            .await
        {
            failures.push(f);
        }

        Ok(Outcome::with_failures(
            IssuedInvitation {
                invitation_id: invitation.id,
                code: invitation.code,
                expires_at: invitation.expires_at,
                partner_name: partner.name,
            },
            failures,
        ))
    }

    /// Pending invitation carrying `code`, whatever its expiry.
    pub(crate) async fn find_pending(&self, code: &str) -> Result<InvitationCode, MembershipError> {
        let code = checks::normalize_code(code);
        if !is_valid_code(&code) {
            return Err(MembershipError::InvalidCode);
        }
        self.store
            .find_pending_invitation_by_code(&code)
            .await?
            .ok_or(MembershipError::InvalidCode)
    }

    /// Flip an invitation whose window has passed to `expired`.
    ///
    /// Returns the side effects of the transition that failed.
    pub(crate) async fn expire(
        &self,
        mut invitation: InvitationCode,
    ) -> Result<Vec<CascadeFailure>, MembershipError> {
        invitation.close(InvitationStatus::Expired, None, Utc::now());
        self.store
            .commit(WriteBatch::new().put_invitation(invitation.clone()))
            .await?;
        tracing::info!(invitation_id = %invitation.id, "invitation expired");
        let mut failures = Vec::new();
        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(&invitation.invited_by, &invitation.partner_id, AuditAction::InvitationExpire)
                    .resource("invitation", invitation.id.to_string())
                    .build(),
            )
            .await
        {
            failures.push(f);
        }
        Ok(failures)
    }

    /// Read-only lookup used to preview a code before accepting it.
    ///
    /// An expired code is reported as `CodeExpired` but left untouched.
    pub async fn get_invitation_by_code(
        &self,
        code: &str,
    ) -> Result<Outcome<InvitationPreview>, MembershipError> {
        let invitation = self.find_pending(code).await?;
        checks::ensure_unexpired(&invitation, Utc::now())?;
        let partner = self.store.get_partner(&invitation.partner_id).await.map_err(|e| match e {
            StoreError::NotFound => MembershipError::NotFound("partner"),
            other => other.into(),
        })?;
        Ok(Outcome::new(InvitationPreview {
            code: invitation.code,
            partner_id: invitation.partner_id,
            partner_name: partner.name,
            name: invitation.name,
            role: invitation.role,
            expires_at: invitation.expires_at,
        }))
    }

    pub async fn accept_invitation_by_code(
        &self,
        code: &str,
        phone_number: &str,
        user_id: &UserId,
    ) -> Result<Outcome<AcceptedInvitation>, Rejection> {
        let mut invitation = self.find_pending(code).await?;
        let now = Utc::now();
        if invitation.is_expired_at(now) {
            let failures = self.expire(invitation).await?;
            return Err(Rejection {
                error: MembershipError::CodeExpired,
                failures,
            });
        }

        let caller_phone =
            checks::normalize_phone(phone_number).map_err(|_| MembershipError::PhoneMismatch)?;
        if caller_phone != invitation.phone_number {
            tracing::warn!(
                invitation_id = %invitation.id,
                user_id = %user_id,
                "invitation presented from a different phone number"
            );
            return Err(MembershipError::PhoneMismatch.into());
        }

        if checks::find_link(self.store.as_ref(), user_id, &invitation.partner_id)
            .await?
            .is_some()
        {
            return Err(MembershipError::AlreadyMember.into());
        }
        let partner = self.store.get_partner(&invitation.partner_id).await.map_err(|e| match e {
            StoreError::NotFound => MembershipError::NotFound("partner"),
            other => other.into(),
        })?;

        let link = WorkspaceLink {
            user_id: user_id.clone(),
            partner_id: invitation.partner_id.clone(),
            tenant_id: invitation.tenant_id.clone(),
            role: invitation.role,
            status: MembershipStatus::Active,
            permissions: invitation.role.default_permissions(),
            joined_at: now,
            suspended_at: None,
            updated_at: now,
        };
        let member = match self.store.get_team_member(&invitation.partner_id, user_id).await {
            Ok(mut existing) => {
                existing.role = invitation.role;
                existing.status = MembershipStatus::Active;
                existing.phone_number = Some(invitation.phone_number.clone());
                if existing.name.trim().is_empty() {
                    existing.name = invitation.name.clone();
                }
                existing.updated_at = now;
                existing
            }
            Err(StoreError::NotFound) => TeamMember {
                partner_id: invitation.partner_id.clone(),
                user_id: user_id.clone(),
                name: invitation.name.clone(),
                phone_number: Some(invitation.phone_number.clone()),
                email: None,
                role: invitation.role,
                status: MembershipStatus::Active,
                skills: Vec::new(),
                tasks_completed: 0,
                suspended_at: None,
                suspended_by: None,
                suspension_reason: None,
                reactivated_at: None,
                reactivated_by: None,
                created_at: now,
                updated_at: now,
            },
            Err(e) => return Err(e.into()),
        };
        invitation.accept(user_id, now);

        self.store
            .commit(
                WriteBatch::new()
                    .put_workspace_link(link.clone())
                    .put_team_member(member)
                    .put_invitation(invitation.clone()),
            )
            .await?;
        tracing::info!(
            partner_id = %invitation.partner_id,
            user_id = %user_id,
            role = %invitation.role,
            "invitation accepted"
        );

        let mut failures: Vec<CascadeFailure> = Vec::new();
        let active_partner_id = match self.claims.on_added(&link).await {
            Ok(claims) => claims.active_partner_id,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "claims sync failed after acceptance");
                metrics::record_cascade_failure(CascadeStep::ClaimsSync.as_str());
                failures.push(CascadeFailure {
                    step: CascadeStep::ClaimsSync,
                    message: e.to_string(),
                });
                None
            }
        };

        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(user_id, &invitation.partner_id, AuditAction::InvitationAccept)
                    .target_user(Some(user_id))
                    .resource("invitation", invitation.id.to_string())
                    .details(serde_json::json!({
                        "role": invitation.role,
                        "invitedBy": invitation.invited_by,
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
                NoticeKind::InvitationAccepted,
                &invitation.partner_id,
                vec![Recipient::User(invitation.invited_by.clone())],
                serde_json::json!({ "userId": user_id, "name": invitation.name }),
            )
            .await
        {
            failures.push(f);
        }

        Ok(Outcome::with_failures(
            AcceptedInvitation {
                partner_id: invitation.partner_id,
                partner_name: partner.name,
                tenant_id: invitation.tenant_id,
                role: invitation.role,
                active_partner_id,
            },
            failures,
        ))
    }

    pub async fn cancel_invitation(
        &self,
        invitation_id: &InvitationId,
        partner_id: &PartnerId,
        cancelled_by: &UserId,
    ) -> Result<Outcome<CancelledInvitation>, MembershipError> {
        let mut invitation = match self.store.get_invitation(invitation_id).await {
            Ok(invitation) => invitation,
            Err(StoreError::NotFound) => return Err(MembershipError::NotFound("invitation")),
            Err(e) => return Err(e.into()),
        };
        if &invitation.partner_id != partner_id {
            return Err(MembershipError::WrongTenant {
                user_id: cancelled_by.to_string(),
                partner_id: invitation.partner_id.to_string(),
            });
        }
        if !invitation.is_pending() {
            return Err(MembershipError::InvalidCode);
        }

        invitation.close(InvitationStatus::Cancelled, Some(cancelled_by), Utc::now());
        self.store
            .commit(WriteBatch::new().put_invitation(invitation.clone()))
            .await?;

        let mut failures = Vec::new();
        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(cancelled_by, partner_id, AuditAction::InvitationCancel)
                    .resource("invitation", invitation.id.to_string())
                    .build(),
            )
            .await
        {
            failures.push(f);
        }
        Ok(Outcome::with_failures(
            CancelledInvitation {
                invitation_id: invitation.id,
            },
            failures,
        ))
    }

    /// Invite many people at once with the bulk/email expiry window.
    ///
    /// Each invitee is issued independently; one failing does not stop the
    /// others. Only an invalid request as a whole (empty, oversized, unknown
    /// partner, bad expiry) is an error.
    pub async fn invite_many(
        &self,
        partner_id: &PartnerId,
        tenant_id: &TenantId,
        invited_by: &UserId,
        invitees: Vec<Invitee>,
        expiry_hours: Option<u32>,
    ) -> Result<BulkResponse, MembershipError> {
        if invitees.is_empty() {
            return Err(MembershipError::validation("no invitees given"));
        }
        if invitees.len() > self.bulk_max_items {
            return Err(MembershipError::validation(format!(
                "at most {} invitations per batch, got {}",
                self.bulk_max_items,
                invitees.len()
            )));
        }
        let expiry = InvitationExpiry::Hours(expiry_hours.unwrap_or(self.default_expiry_hours));
        expiry.duration()?;
        match self.store.get_partner(partner_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => return Err(MembershipError::NotFound("partner")),
            Err(e) => return Err(e.into()),
        }

        let mut results = Vec::with_capacity(invitees.len());
        for (index, invitee) in invitees.into_iter().enumerate() {
            let target = invitee.phone_number.clone();
            let outcome = self
                .issue_invitation(InvitationRequest {
                    phone_number: invitee.phone_number,
                    name: invitee.name,
                    partner_id: partner_id.clone(),
                    tenant_id: tenant_id.clone(),
                    role: invitee.role,
                    invited_by: invited_by.clone(),
                    expiry,
                })
                .await;
            results.push(match outcome {
                Ok(issued) => {
                    let mut result = BulkItemResult::passed(
                        index,
                        target,
                        "invite",
                        format!("invitation {} issued", issued.value.code),
                    );
                    result.warnings = issued.failures;
                    result
                }
                Err(e) => {
                    tracing::warn!(partner_id = %partner_id, index, error = %e, "bulk invitation failed");
                    BulkItemResult::rejected(index, target, "invite", &e)
                }
            });
        }

        let summary = BulkSummary::of(&results);
        let mut warnings = Vec::new();
        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(invited_by, partner_id, AuditAction::BulkInvite)
                    .resource("bulk_invite", uuid::Uuid::now_v7().to_string())
                    .details(serde_json::json!({
                        "total": summary.total,
                        "successful": summary.successful,
                        "failed": summary.failed,
                        "expiryHours": expiry_hours.unwrap_or(self.default_expiry_hours),
                    }))
                    .build(),
            )
            .await
        {
            warnings.push(f);
        }

        Ok(BulkResponse {
            success: summary.failed == 0,
            message: format!(
                "Issued {} of {} invitations",
                summary.successful, summary.total
            ),
            dry_run: false,
            executed: true,
            error_kind: None,
            warnings,
            results,
            summary,
        })
    }

    pub async fn list_invitations(
        &self,
        partner_id: &PartnerId,
        status: Option<InvitationStatus>,
    ) -> Result<Outcome<InvitationList>, MembershipError> {
        let invitations = self.store.list_invitations(partner_id, status).await?;
        Ok(Outcome::new(InvitationList { invitations }))
    }
}
