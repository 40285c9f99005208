//! Strongly-typed identifiers (avoid mixing strings arbitrarily).
//!
//! User ids come from the identity provider and partner/tenant ids from the
//! onboarding flow, so they are opaque strings. Invitations are minted here
//! and use time-ordered UUIDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// User identifier (identity provider uid).
    UserId
);
string_id!(
    /// Partner (tenant organization) identifier.
    PartnerId
);
string_id!(
    /// Tenant identifier carried alongside the partner for authorization.
    TenantId
);
string_id!(
    /// Task identifier, owned by the task-tracking area.
    TaskId
);

/// Invitation identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationId(pub Uuid);

impl InvitationId {
    /// Generate a new time-ordered invitation id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for InvitationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvitationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for InvitationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_ids_display_and_equality() {
        let a = UserId::from("u9");
        let b = UserId("u9".to_string());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "u9");
        assert_eq!(PartnerId::from("P1").as_str(), "P1");
    }

    #[test]
    fn test_string_ids_serialize_transparent() {
        let json = serde_json::to_string(&PartnerId::from("P1")).unwrap();
        assert_eq!(json, "\"P1\"");
    }

    #[test]
    fn test_invitation_id_parse() {
        let id = InvitationId::new();
        let parsed: InvitationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<InvitationId>().is_err());
    }

    #[test]
    fn test_invitation_id_is_v7() {
        assert_eq!(InvitationId::new().0.get_version_num(), 7);
    }

    #[test]
    fn test_ids_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(UserId::from("u1"));
        assert!(set.contains(&UserId::from("u1")));
        assert!(!set.contains(&UserId::from("u2")));
    }
}
