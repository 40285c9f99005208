//! Shared harness for membership integration tests.
//!
//! Builds a [`MembershipService`] over an in-memory SQLite database (which
//! also serves as audit log and identity provider) and an in-process
//! notifier. Not every test file uses every helper.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use crewdeck_audit::AuditLog;
use crewdeck_identity::{IdentityClaims, IdentityProvider};
use crewdeck_membership::{Backends, MembershipConfig, MembershipService};
use crewdeck_notify::Notifier;
use crewdeck_notify_memory::MemoryNotifier;
use crewdeck_storage::{
    InvitationCode, MemberRole, MembershipStatus, Partner, PartnerId, Store, Task, TaskId,
    TaskStatus, TeamMember, TenantId, UserId, WorkspaceLink, WriteBatch,
};
use crewdeck_store_sqlite::SqliteStore;

pub const ADMIN: &str = "admin1";

pub struct TestHarness {
    pub store: Arc<SqliteStore>,
    pub notifier: Arc<MemoryNotifier>,
    pub service: MembershipService,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(MembershipConfig::default()).await
    }

    pub async fn with_config(config: MembershipConfig) -> Self {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let notifier = Arc::new(MemoryNotifier::new());
        let service = MembershipService::new(
            Backends {
                store: store.clone() as Arc<dyn Store>,
                identity: store.clone() as Arc<dyn IdentityProvider>,
                audit: store.clone() as Arc<dyn AuditLog>,
                notifier: notifier.clone() as Arc<dyn Notifier>,
            },
            &config,
        );
        Self {
            store,
            notifier,
            service,
        }
    }

    /// Partner `id` with tenant `T-{id}` and an active admin `admin1`.
    pub async fn seed_partner(&self, id: &str, name: &str) -> PartnerId {
        let now = Utc::now();
        let partner_id = PartnerId::from(id);
        let admin = TeamMember {
            partner_id: partner_id.clone(),
            user_id: UserId::from(ADMIN),
            name: "Admin".into(),
            phone_number: None,
            email: Some("admin@example.com".into()),
            role: MemberRole::PartnerAdmin,
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
        };
        let link = WorkspaceLink {
            user_id: UserId::from(ADMIN),
            partner_id: partner_id.clone(),
            tenant_id: tenant(id),
            role: MemberRole::PartnerAdmin,
            status: MembershipStatus::Active,
            permissions: MemberRole::PartnerAdmin.default_permissions(),
            joined_at: now,
            suspended_at: None,
            updated_at: now,
        };
        self.store
            .commit(
                WriteBatch::new()
                    .put_partner(Partner {
                        id: partner_id.clone(),
                        name: name.into(),
                        status: "active".into(),
                        plan: "team".into(),
                        created_at: now,
                    })
                    .put_team_member(admin)
                    .put_workspace_link(link),
            )
            .await
            .unwrap();
        partner_id
    }

    /// Invite `phone` into `partner` as `role` and accept it as `user`.
    pub async fn join(&self, partner: &str, user: &str, phone: &str, role: MemberRole) -> UserId {
        let issued = self
            .service
            .generate_invitation_code(
                phone,
                &user.to_uppercase(),
                &PartnerId::from(partner),
                &tenant(partner),
                role,
                &UserId::from(ADMIN),
            )
            .await;
        assert!(issued.success, "{}", issued.message);
        let code = issued.payload.unwrap().code;
        let user_id = UserId::from(user);
        let accepted = self
            .service
            .accept_invitation_by_code(&code, phone, &user_id)
            .await;
        assert!(accepted.success, "{}", accepted.message);
        user_id
    }

    /// Issue a fresh code for `phone` and return it.
    pub async fn code_for(&self, partner: &str, phone: &str) -> String {
        let issued = self
            .service
            .generate_invitation_code(
                phone,
                "Returning",
                &PartnerId::from(partner),
                &tenant(partner),
                MemberRole::Employee,
                &UserId::from(ADMIN),
            )
            .await;
        assert!(issued.success, "{}", issued.message);
        issued.payload.unwrap().code
    }

    pub async fn seed_task(&self, partner: &str, id: &str, assignee: &str, status: TaskStatus) {
        let now = Utc::now();
        self.store
            .commit(WriteBatch::new().put_task(Task {
                id: TaskId::from(id),
                partner_id: PartnerId::from(partner),
                title: format!("Task {id}"),
                assignee: Some(UserId::from(assignee)),
                status,
                revocation_reason: None,
                revoked_at: None,
                transferred_from: None,
                transferred_by: None,
                transferred_at: None,
                created_at: now,
                updated_at: now,
            }))
            .await
            .unwrap();
    }

    /// Push a pending invitation's expiry into the past.
    pub async fn backdate(&self, code: &str) {
        let mut invitation = self.pending(code).await.unwrap();
        invitation.expires_at = Utc::now() - Duration::hours(1);
        self.store
            .commit(WriteBatch::new().put_invitation(invitation))
            .await
            .unwrap();
    }

    pub async fn pending(&self, code: &str) -> Option<InvitationCode> {
        self.store.find_pending_invitation_by_code(code).await.unwrap()
    }

    pub async fn member(&self, partner: &str, user: &str) -> TeamMember {
        self.store
            .get_team_member(&PartnerId::from(partner), &UserId::from(user))
            .await
            .unwrap()
    }

    pub async fn link(&self, partner: &str, user: &str) -> WorkspaceLink {
        self.store
            .get_workspace_link(&UserId::from(user), &PartnerId::from(partner))
            .await
            .unwrap()
    }

    pub async fn claims(&self, user: &str) -> IdentityClaims {
        self.store
            .get_claims(&UserId::from(user))
            .await
            .unwrap()
            .claims
    }

    pub async fn tasks_of(&self, partner: &str, user: &str) -> Vec<Task> {
        self.store
            .list_tasks(&PartnerId::from(partner), Some(UserId::from(user)), vec![])
            .await
            .unwrap()
    }
}

pub fn tenant(partner: &str) -> TenantId {
    TenantId::from(format!("T-{partner}"))
}

pub fn admin() -> UserId {
    UserId::from(ADMIN)
}
