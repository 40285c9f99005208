//! Workspace membership and invitation lifecycle for crewdeck.
//!
//! A user joins a partner by accepting an invitation code, can be suspended
//! and reactivated, and can have their role changed. Each transition commits
//! the membership records atomically through the [`Store`], then keeps the
//! identity provider's claims, the member's tasks, the audit trail and
//! notifications in step as best-effort follow-ups.
//!
//! [`MembershipService`] is the usual entry point:
//!
//! ```ignore
//! let service = MembershipService::new(backends, &MembershipConfig::from_env()?);
//! let response = service
//!     .deactivate_team_member(&partner_id, &user_id, &admin_id, None)
//!     .await;
//! println!("{}", response.message);
//! ```
//!
//! [`Store`]: crewdeck_storage::Store

pub mod audit;
pub mod bulk;
pub mod checks;
pub mod claims;
pub mod config;
pub mod error;
pub mod invitations;
pub mod lifecycle;
pub mod metrics;
pub mod notices;
pub mod response;
pub mod service;
pub mod tasks;

pub use audit::AuditLogger;
pub use bulk::{BulkAction, BulkItem, BulkOperationCoordinator, BulkRequest};
pub use claims::{derive_claims, ClaimsChange, ClaimsSynchronizer};
pub use config::{ConfigError, MembershipConfig};
pub use error::{ErrorKind, MembershipError};
pub use invitations::{
    AcceptedInvitation, CancelledInvitation, InvitationCodeIssuer, InvitationExpiry,
    InvitationList, InvitationPreview, InvitationRequest, Invitee, IssuedInvitation,
    CODE_ALPHABET, CODE_LENGTH, CODE_TTL_DAYS,
};
pub use lifecycle::{
    Deactivated, MemberDetail, MemberList, MembershipLifecycleManager, Reactivated, RoleUpdated,
};
pub use notices::Notices;
pub use response::{
    BulkItemResult, BulkResponse, BulkSummary, CascadeFailure, CascadeStep, OperationResponse,
    Outcome, Rejection,
};
pub use service::{AuditEntries, Backends, ClaimsView, MembershipService};
pub use tasks::{TaskCascadeReassigner, TasksTransferred};
