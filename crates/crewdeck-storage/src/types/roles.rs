//! Role and status enums shared by membership records.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Error type for parsing a role or status from its stored string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

macro_rules! str_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Role of a member within a partner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    PartnerAdmin,
    Employee,
}

str_enum!(MemberRole, "member role", {
    PartnerAdmin => "partner_admin",
    Employee => "employee",
});

impl MemberRole {
    /// Permissions granted on the workspace link for this role.
    pub fn default_permissions(&self) -> Vec<String> {
        let perms: &[&str] = match self {
            MemberRole::PartnerAdmin => &[
                "members.manage",
                "invitations.manage",
                "tasks.manage",
                "tasks.view",
                "chat.use",
            ],
            MemberRole::Employee => &["tasks.view", "tasks.update", "chat.use"],
        };
        perms.iter().map(|p| p.to_string()).collect()
    }
}

/// Status shared by `TeamMember` and `WorkspaceLink`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Suspended,
}

str_enum!(MembershipStatus, "membership status", {
    Active => "active",
    Suspended => "suspended",
});

/// Lifecycle of an invitation code. Everything but `Pending` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Cancelled,
}

str_enum!(InvitationStatus, "invitation status", {
    Pending => "pending",
    Accepted => "accepted",
    Expired => "expired",
    Cancelled => "cancelled",
});

/// Task status as tracked by the task board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Unassigned,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

str_enum!(TaskStatus, "task status", {
    Unassigned => "unassigned",
    Assigned => "assigned",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl TaskStatus {
    /// Statuses that mean someone is on the hook for the task.
    pub const OPEN: [TaskStatus; 2] = [TaskStatus::Assigned, TaskStatus::InProgress];

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }
}
