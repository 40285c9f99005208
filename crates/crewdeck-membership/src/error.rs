use crewdeck_identity::IdentityError;
use crewdeck_storage::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a membership operation failed.
///
/// `Display` is the human-readable message handed back to callers;
/// [`MembershipError::kind`] is for programmatic branching.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("user {user_id} is not a member of partner {partner_id}")]
    WrongTenant { user_id: String, partner_id: String },

    #[error("user is already a member of this workspace")]
    AlreadyMember,

    #[error("member is already suspended")]
    AlreadySuspended,

    #[error("member is not suspended")]
    NotSuspended,

    #[error("you cannot {0} yourself")]
    SelfActionForbidden(&'static str),

    #[error("invalid or unknown invitation code")]
    InvalidCode,

    #[error("invitation code has expired; ask the workspace admin for a new one")]
    CodeExpired,

    #[error("this invitation was issued for a different phone number")]
    PhoneMismatch,

    #[error("could not generate a unique invitation code after {0} attempts")]
    GenerationExhausted(u32),

    #[error("{0}")]
    Validation(String),

    #[error("claims sync failed: {0}")]
    ClaimsSyncFailed(String),

    #[error("operation failed: {0}")]
    Execution(String),
}

/// Serializable error kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    WrongTenant,
    AlreadyMember,
    AlreadySuspended,
    NotSuspended,
    SelfActionForbidden,
    InvalidCode,
    CodeExpired,
    PhoneMismatch,
    GenerationExhausted,
    ValidationError,
    ClaimsSyncFailed,
    ExecutionError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::WrongTenant => "wrong_tenant",
            ErrorKind::AlreadyMember => "already_member",
            ErrorKind::AlreadySuspended => "already_suspended",
            ErrorKind::NotSuspended => "not_suspended",
            ErrorKind::SelfActionForbidden => "self_action_forbidden",
            ErrorKind::InvalidCode => "invalid_code",
            ErrorKind::CodeExpired => "code_expired",
            ErrorKind::PhoneMismatch => "phone_mismatch",
            ErrorKind::GenerationExhausted => "generation_exhausted",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::ClaimsSyncFailed => "claims_sync_failed",
            ErrorKind::ExecutionError => "execution_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MembershipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MembershipError::NotFound(_) => ErrorKind::NotFound,
            MembershipError::WrongTenant { .. } => ErrorKind::WrongTenant,
            MembershipError::AlreadyMember => ErrorKind::AlreadyMember,
            MembershipError::AlreadySuspended => ErrorKind::AlreadySuspended,
            MembershipError::NotSuspended => ErrorKind::NotSuspended,
            MembershipError::SelfActionForbidden(_) => ErrorKind::SelfActionForbidden,
            MembershipError::InvalidCode => ErrorKind::InvalidCode,
            MembershipError::CodeExpired => ErrorKind::CodeExpired,
            MembershipError::PhoneMismatch => ErrorKind::PhoneMismatch,
            MembershipError::GenerationExhausted(_) => ErrorKind::GenerationExhausted,
            MembershipError::Validation(_) => ErrorKind::ValidationError,
            MembershipError::ClaimsSyncFailed(_) => ErrorKind::ClaimsSyncFailed,
            MembershipError::Execution(_) => ErrorKind::ExecutionError,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        MembershipError::Validation(message.into())
    }

    /// Failures of the machinery itself rather than of the request.
    pub fn is_execution(&self) -> bool {
        matches!(self, MembershipError::Execution(_))
    }
}

impl From<StoreError> for MembershipError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => MembershipError::NotFound("record"),
            other => MembershipError::Execution(other.to_string()),
        }
    }
}

impl From<IdentityError> for MembershipError {
    fn from(e: IdentityError) -> Self {
        MembershipError::ClaimsSyncFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_snake_case() {
        let kind = MembershipError::SelfActionForbidden("deactivate").kind();
        assert_eq!(
            serde_json::to_value(kind).unwrap(),
            serde_json::json!("self_action_forbidden")
        );
        assert_eq!(kind.to_string(), "self_action_forbidden");
        assert_eq!(
            MembershipError::validation("name is required").kind(),
            ErrorKind::ValidationError
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let not_found: MembershipError = StoreError::NotFound.into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let backend: MembershipError = StoreError::Backend("disk full".into()).into();
        assert!(backend.is_execution());
        assert!(backend.to_string().contains("disk full"));
    }

    #[test]
    fn test_identity_error_conversion() {
        let e: MembershipError = IdentityError::Unavailable("timeout".into()).into();
        assert_eq!(e.kind(), ErrorKind::ClaimsSyncFailed);
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            MembershipError::SelfActionForbidden("deactivate").to_string(),
            "you cannot deactivate yourself"
        );
        assert_eq!(
            MembershipError::NotFound("partner").to_string(),
            "partner not found"
        );
    }
}
