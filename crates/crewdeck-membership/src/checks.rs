//! Precondition predicates shared by the single-item operations and the bulk
//! validator.

use chrono::{DateTime, Utc};
use crewdeck_storage::{
    InvitationCode, MemberRole, PartnerId, Store, StoreError, TeamMember, UserId, WorkspaceLink,
};

use crate::error::MembershipError;

pub const MIN_PHONE_DIGITS: usize = 7;
pub const MAX_PHONE_DIGITS: usize = 15;

/// Reject an actor targeting themselves.
pub fn ensure_not_self(
    actor: &UserId,
    target: &UserId,
    verb: &'static str,
) -> Result<(), MembershipError> {
    if actor == target {
        return Err(MembershipError::SelfActionForbidden(verb));
    }
    Ok(())
}

/// Load the membership of `user_id` in `partner_id`.
///
/// `NotFound` when the user has no membership anywhere, `WrongTenant` when
/// they only belong to other partners.
pub async fn load_membership(
    store: &dyn Store,
    partner_id: &PartnerId,
    user_id: &UserId,
) -> Result<TeamMember, MembershipError> {
    match store.get_team_member(partner_id, user_id).await {
        Ok(member) => Ok(member),
        Err(StoreError::NotFound) => {
            let elsewhere = store.list_memberships_for_user(user_id).await?;
            if elsewhere.is_empty() {
                Err(MembershipError::NotFound("team member"))
            } else {
                Err(MembershipError::WrongTenant {
                    user_id: user_id.to_string(),
                    partner_id: partner_id.to_string(),
                })
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// The workspace link for a pair, if any.
pub async fn find_link(
    store: &dyn Store,
    user_id: &UserId,
    partner_id: &PartnerId,
) -> Result<Option<WorkspaceLink>, MembershipError> {
    match store.get_workspace_link(user_id, partner_id).await {
        Ok(link) => Ok(Some(link)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn ensure_active(member: &TeamMember) -> Result<(), MembershipError> {
    if member.is_suspended() {
        return Err(MembershipError::AlreadySuspended);
    }
    Ok(())
}

pub fn ensure_suspended(member: &TeamMember) -> Result<(), MembershipError> {
    if !member.is_suspended() {
        return Err(MembershipError::NotSuspended);
    }
    Ok(())
}

/// Require an optional field to be present and non-blank.
pub fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, MembershipError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(MembershipError::validation(format!("{field} is required"))),
    }
}

pub fn parse_role(value: &str) -> Result<MemberRole, MembershipError> {
    value.trim().parse::<MemberRole>().map_err(|_| {
        MembershipError::validation(format!(
            "invalid role '{value}'; expected partner_admin or employee"
        ))
    })
}

pub fn validate_name(name: &str) -> Result<String, MembershipError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MembershipError::validation("name is required"));
    }
    Ok(name.to_string())
}

/// Normalize a phone number to `+digits`.
///
/// Spaces, dashes, dots and parentheses are dropped; anything else that isn't
/// a digit (or a single leading `+`) is rejected.
pub fn normalize_phone(raw: &str) -> Result<String, MembershipError> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let mut digits = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => {
                return Err(MembershipError::validation(format!(
                    "invalid phone number '{raw}'"
                )))
            }
        }
    }
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
        return Err(MembershipError::validation(format!(
            "phone number must have {MIN_PHONE_DIGITS} to {MAX_PHONE_DIGITS} digits"
        )));
    }
    Ok(format!("+{digits}"))
}

/// Codes are matched case-insensitively by upper-casing the input.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// A pending invitation usable for `partner_id`.
pub fn ensure_code_for_partner(
    invitation: &InvitationCode,
    partner_id: &PartnerId,
) -> Result<(), MembershipError> {
    if !invitation.is_pending() || &invitation.partner_id != partner_id {
        return Err(MembershipError::InvalidCode);
    }
    Ok(())
}

pub fn ensure_unexpired(
    invitation: &InvitationCode,
    now: DateTime<Utc>,
) -> Result<(), MembershipError> {
    if invitation.is_expired_at(now) {
        return Err(MembershipError::CodeExpired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_self_action() {
        let u = UserId::from("u1");
        assert!(matches!(
            ensure_not_self(&u, &u, "deactivate"),
            Err(MembershipError::SelfActionForbidden("deactivate"))
        ));
        assert!(ensure_not_self(&UserId::from("admin"), &u, "deactivate").is_ok());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+1 (555) 123-4567").unwrap(), "+15551234567");
        assert_eq!(normalize_phone("49.30.1234567").unwrap(), "+49301234567");
        assert_eq!(normalize_phone(" +15551234567 ").unwrap(), "+15551234567");
    }

    #[test]
    fn test_normalize_phone_rejects() {
        for bad in ["", "+", "12345", "+1234567890123456", "555-CALL-NOW", "++15551234567"] {
            let err = normalize_phone(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationError, "{bad}");
        }
    }

    #[test]
    fn test_require() {
        assert_eq!(require(Some(" ABC "), "invitationCode").unwrap(), "ABC");
        let err = require(Some("  "), "invitationCode").unwrap_err();
        assert_eq!(err.to_string(), "invitationCode is required");
        assert!(require(None, "newRole").is_err());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("employee").unwrap(), MemberRole::Employee);
        assert_eq!(parse_role(" partner_admin").unwrap(), MemberRole::PartnerAdmin);
        assert_eq!(
            parse_role("owner").unwrap_err().kind(),
            ErrorKind::ValidationError
        );
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" ab3def9k "), "AB3DEF9K");
    }
}
