//! Degraded paths, driven by mocks standing in for one backend at a time.

mod common;

use std::sync::Arc;

use common::{admin, tenant, TestHarness};
use crewdeck_audit::{AuditLog, AuditLogError, MockAuditLog};
use crewdeck_identity::{IdentityError, IdentityProvider, MockIdentityProvider};
use crewdeck_membership::{
    Backends, BulkAction, BulkItem, BulkRequest, CascadeStep, ErrorKind, MembershipConfig,
    MembershipService,
};
use crewdeck_notify::{MockNotifier, Notifier, NotifyError};
use crewdeck_notify_memory::MemoryNotifier;
use crewdeck_storage::{
    MemberRole, MembershipStatus, MockStore, PartnerId, Store, StoreError, TaskStatus, UserId,
};
use crewdeck_store_sqlite::SqliteStore;

const PHONE: &str = "+15550000009";

/// Harness whose service talks to the given identity provider, notifier
/// and audit log instead of the SQLite/in-memory ones.
async fn degraded(
    identity: Option<Arc<dyn IdentityProvider>>,
    notifier: Option<Arc<dyn Notifier>>,
    audit: Option<Arc<dyn AuditLog>>,
) -> (TestHarness, MembershipService) {
    let h = TestHarness::new().await;
    h.seed_partner("P1", "Acme").await;
    h.join("P1", "u9", PHONE, MemberRole::Employee).await;
    let store: Arc<SqliteStore> = h.store.clone();
    let service = MembershipService::new(
        Backends {
            store: store.clone() as Arc<dyn Store>,
            identity: identity.unwrap_or_else(|| store.clone() as Arc<dyn IdentityProvider>),
            audit: audit.unwrap_or_else(|| store.clone() as Arc<dyn AuditLog>),
            notifier: notifier.unwrap_or_else(|| Arc::new(MemoryNotifier::new()) as Arc<dyn Notifier>),
        },
        &MembershipConfig::default(),
    );
    (h, service)
}

fn identity_down() -> Arc<dyn IdentityProvider> {
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_get_claims()
        .returning(|_| Err(IdentityError::Unavailable("connection refused".into())));
    identity.expect_set_claims().never();
    Arc::new(identity)
}

#[tokio::test]
async fn identity_outage_degrades_deactivation() {
    let (h, service) = degraded(Some(identity_down()), None, None).await;
    let p1 = PartnerId::from("P1");
    let u9 = UserId::from("u9");

    let response = service.deactivate_team_member(&p1, &u9, &admin(), None).await;
    assert!(response.success, "{}", response.message);
    assert_eq!(response.error_kind, Some(ErrorKind::ClaimsSyncFailed));
    assert_eq!(response.outcome_label(), "degraded");
    assert!(response.warnings.iter().any(|w| w.step == CascadeStep::ClaimsSync));
    assert!(response.message.contains("claims_sync"));

    // The suspension stands; claims lag behind until reconciled.
    assert_eq!(h.member("P1", "u9").await.status, MembershipStatus::Suspended);
    assert!(h.claims("u9").await.has_partner(&p1));

    let repaired = h.service.reconcile_claims(&u9).await;
    assert!(repaired.success);
    assert!(!h.claims("u9").await.has_partner(&p1));
}

#[tokio::test]
async fn identity_outage_degrades_acceptance() {
    let (h, service) = degraded(Some(identity_down()), None, None).await;
    let code = h.code_for("P1", "+15550000001").await;

    let response = service
        .accept_invitation_by_code(&code, "+15550000001", &UserId::from("u1"))
        .await;
    assert!(response.success);
    assert_eq!(response.error_kind, Some(ErrorKind::ClaimsSyncFailed));
    assert_eq!(response.payload.unwrap().active_partner_id, None);
    assert_eq!(h.link("P1", "u1").await.status, MembershipStatus::Active);
}

#[tokio::test]
async fn notifier_outage_is_a_warning_only() {
    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .returning(|_| Err(NotifyError::Delivery("sms gateway down".into())));
    let (h, service) = degraded(None, Some(Arc::new(notifier)), None).await;

    let response = service
        .generate_invitation_code(
            "+15550000001",
            "Ana",
            &PartnerId::from("P1"),
            &tenant("P1"),
            MemberRole::Employee,
            &admin(),
        )
        .await;
    assert!(response.success);
    assert_eq!(response.error_kind, None);
    assert_eq!(response.warnings.len(), 1);
    assert_eq!(response.warnings[0].step, CascadeStep::Notification);
    let code = response.payload.unwrap().code;
    assert!(h.pending(&code).await.is_some());
}

#[tokio::test]
async fn audit_outage_is_a_warning_only() {
    let mut audit = MockAuditLog::new();
    audit
        .expect_record()
        .returning(|_| Err(AuditLogError::Database("disk I/O error".into())));
    let (h, service) = degraded(None, None, Some(Arc::new(audit))).await;

    let response = service
        .update_team_member_role(&PartnerId::from("P1"), &UserId::from("u9"), "partner_admin", &admin())
        .await;
    assert!(response.success);
    assert!(response.warnings.iter().any(|w| w.step == CascadeStep::Audit));
    assert_eq!(h.member("P1", "u9").await.role, MemberRole::PartnerAdmin);
}

fn audit_down() -> Arc<dyn AuditLog> {
    let mut audit = MockAuditLog::new();
    audit
        .expect_record()
        .returning(|_| Err(AuditLogError::Database("disk I/O error".into())));
    Arc::new(audit)
}

#[tokio::test]
async fn audit_outage_during_revocation_is_reported() {
    let (h, service) = degraded(None, None, Some(audit_down())).await;
    h.seed_task("P1", "t1", "u9", TaskStatus::Assigned).await;

    let response = service
        .deactivate_team_member(&PartnerId::from("P1"), &UserId::from("u9"), &admin(), None)
        .await;
    assert!(response.success);
    assert_eq!(response.payload.unwrap().tasks_revoked, 1);
    // One for the revoked tasks, one for the deactivation itself.
    let audit_warnings = response
        .warnings
        .iter()
        .filter(|w| w.step == CascadeStep::Audit)
        .count();
    assert_eq!(audit_warnings, 2);
}

#[tokio::test]
async fn expired_code_reports_lost_audit_entry() {
    let (h, service) = degraded(None, None, Some(audit_down())).await;
    let code = h.code_for("P1", "+15550000001").await;
    h.backdate(&code).await;

    let response = service
        .accept_invitation_by_code(&code, "+15550000001", &UserId::from("u1"))
        .await;
    assert!(!response.success);
    assert_eq!(response.error_kind, Some(ErrorKind::CodeExpired));
    assert_eq!(response.warnings.len(), 1);
    assert_eq!(response.warnings[0].step, CascadeStep::Audit);
    // The code was still flipped to expired.
    assert!(h.pending(&code).await.is_none());
}

#[tokio::test]
async fn audit_outage_surfaces_on_bulk_response() {
    let (h, service) = degraded(None, None, Some(audit_down())).await;

    let response = service
        .execute_bulk(BulkRequest {
            partner_id: PartnerId::from("P1"),
            performed_by: admin(),
            items: vec![BulkItem {
                user_id: UserId::from("u9"),
                action: BulkAction::Deactivate,
                reason: None,
                invitation_code: None,
                new_role: None,
                transfer_to_user_id: None,
            }],
            dry_run: false,
        })
        .await;
    assert!(response.success, "{}", response.message);
    assert!(response.executed);
    assert_eq!(response.warnings.len(), 1);
    assert_eq!(response.warnings[0].step, CascadeStep::Audit);
    assert!(response.results[0]
        .warnings
        .iter()
        .any(|w| w.step == CascadeStep::Audit));
    assert_eq!(h.member("P1", "u9").await.status, MembershipStatus::Suspended);
}

#[tokio::test]
async fn unreachable_store_aborts_bulk_validation() {
    let mut store = MockStore::new();
    store
        .expect_get_team_member()
        .returning(|_, _| Err(StoreError::Backend("database is locked".into())));
    store.expect_commit().never();

    let service = MembershipService::new(
        Backends {
            store: Arc::new(store),
            identity: identity_down(),
            audit: Arc::new(MockAuditLog::new()),
            notifier: Arc::new(MemoryNotifier::new()),
        },
        &MembershipConfig::default(),
    );
    let response = service
        .execute_bulk(BulkRequest {
            partner_id: PartnerId::from("P1"),
            performed_by: admin(),
            items: vec![BulkItem {
                user_id: UserId::from("u9"),
                action: BulkAction::Deactivate,
                reason: None,
                invitation_code: None,
                new_role: None,
                transfer_to_user_id: None,
            }],
            dry_run: false,
        })
        .await;

    assert!(!response.success);
    assert!(!response.executed);
    assert!(response.results.is_empty());
    assert_eq!(response.error_kind, Some(ErrorKind::ExecutionError));
}
