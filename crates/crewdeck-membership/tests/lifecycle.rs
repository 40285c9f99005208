mod common;

use common::{admin, TestHarness};
use crewdeck_audit::{AuditAction, AuditLogFilter, AuditResult};
use crewdeck_membership::ErrorKind;
use crewdeck_notify::{NoticeChannel, NoticeKind, Recipient};
use crewdeck_storage::{MemberRole, MembershipStatus, PartnerId, TaskStatus, UserId};

#[tokio::test]
async fn deactivating_yourself_is_forbidden() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    let u9 = h.join("P1", "u9", "+15550000009", MemberRole::PartnerAdmin).await;

    let own = h.service.deactivate_team_member(&p1, &u9, &u9, None).await;
    assert_eq!(own.error_kind, Some(ErrorKind::SelfActionForbidden));
    // Checked before the member is even looked up.
    let ghost = UserId::from("ghost");
    let unknown = h.service.deactivate_team_member(&p1, &ghost, &ghost, None).await;
    assert_eq!(unknown.error_kind, Some(ErrorKind::SelfActionForbidden));

    assert_eq!(h.member("P1", "u9").await.status, MembershipStatus::Active);
}

#[tokio::test]
async fn deactivation_preconditions() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    h.seed_partner("P2", "Globex").await;
    let u9 = h.join("P2", "u9", "+15550000009", MemberRole::Employee).await;

    let wrong = h.service.deactivate_team_member(&p1, &u9, &admin(), None).await;
    assert_eq!(wrong.error_kind, Some(ErrorKind::WrongTenant));

    let missing = h
        .service
        .deactivate_team_member(&p1, &UserId::from("nobody"), &admin(), None)
        .await;
    assert_eq!(missing.error_kind, Some(ErrorKind::NotFound));

    let p2 = PartnerId::from("P2");
    assert!(h.service.deactivate_team_member(&p2, &u9, &admin(), None).await.success);
    let again = h.service.deactivate_team_member(&p2, &u9, &admin(), None).await;
    assert_eq!(again.error_kind, Some(ErrorKind::AlreadySuspended));
}

#[tokio::test]
async fn underscored_ids_do_not_share_links() {
    let h = TestHarness::new().await;
    h.seed_partner("c", "Cee").await;
    let b_c = h.seed_partner("b_c", "Bee Cee").await;
    h.join("c", "a_b", "+15550000001", MemberRole::PartnerAdmin).await;
    let a = h.join("b_c", "a", "+15550000002", MemberRole::Employee).await;

    assert_eq!(h.link("b_c", "a").await.user_id, a);
    assert!(h.service.deactivate_team_member(&b_c, &a, &admin(), None).await.success);

    assert_eq!(h.link("b_c", "a").await.status, MembershipStatus::Suspended);
    let other = h.link("c", "a_b").await;
    assert_eq!(other.status, MembershipStatus::Active);
    assert_eq!(other.role, MemberRole::PartnerAdmin);
    assert!(h.claims("a_b").await.has_partner(&PartnerId::from("c")));
}

#[tokio::test]
async fn deactivation_moves_active_partner() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    let p2 = h.seed_partner("P2", "Globex").await;
    let p3 = h.seed_partner("P3", "Initech").await;
    let phone = "+15550000009";
    h.join("P3", "u9", phone, MemberRole::PartnerAdmin).await;
    h.join("P2", "u9", phone, MemberRole::Employee).await;
    let u9 = h.join("P1", "u9", phone, MemberRole::Employee).await;

    let claims = h.claims("u9").await;
    assert_eq!(claims.active_partner_id, Some(p3.clone()));
    assert_eq!(claims.partner_ids.len(), 3);

    assert!(h.service.deactivate_team_member(&p3, &u9, &admin(), None).await.success);
    let claims = h.claims("u9").await;
    assert_eq!(claims.active_partner_id, Some(p1.clone()));
    assert_eq!(claims.role.as_deref(), Some("employee"));
    assert!(!claims.has_partner(&p3));

    assert!(h.service.deactivate_team_member(&p1, &u9, &admin(), None).await.success);
    assert_eq!(h.claims("u9").await.active_partner_id, Some(p2.clone()));

    assert!(h.service.deactivate_team_member(&p2, &u9, &admin(), None).await.success);
    let claims = h.claims("u9").await;
    assert!(claims.partner_ids.is_empty());
    assert_eq!(claims.active_partner_id, None);
    assert_eq!(claims.active_tenant_id, None);
    assert_eq!(claims.role, None);
}

#[tokio::test]
async fn deactivation_revokes_open_tasks() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    let u9 = h.join("P1", "u9", "+15550000009", MemberRole::Employee).await;
    h.seed_task("P1", "t1", "u9", TaskStatus::Assigned).await;
    h.seed_task("P1", "t2", "u9", TaskStatus::InProgress).await;
    h.seed_task("P1", "t3", "u9", TaskStatus::Completed).await;
    h.seed_task("P2", "t4", "u9", TaskStatus::Assigned).await;

    let response = h
        .service
        .deactivate_team_member(&p1, &u9, &admin(), Some("contract ended".into()))
        .await;
    assert!(response.success, "{}", response.message);
    assert_eq!(response.payload.unwrap().tasks_revoked, 2);

    let remaining = h.tasks_of("P1", "u9").await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].status, TaskStatus::Completed);
    // Other partners' tasks are out of reach.
    assert_eq!(h.tasks_of("P2", "u9").await.len(), 1);

    let member = h.member("P1", "u9").await;
    assert_eq!(member.suspension_reason.as_deref(), Some("contract ended"));
    assert_eq!(member.suspended_by, Some(admin()));

    let entries = h
        .service
        .query_audit(&p1, AuditLogFilter::new().target_user_id(u9.clone()))
        .await
        .payload
        .unwrap()
        .entries;
    let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
    assert!(actions.contains(&AuditAction::MemberDeactivate));
    assert!(actions.contains(&AuditAction::TasksRevoke));
    let deactivate = entries
        .iter()
        .find(|e| e.action == AuditAction::MemberDeactivate)
        .unwrap();
    assert_eq!(deactivate.result, AuditResult::Success);
}

#[tokio::test]
async fn deactivate_then_reactivate_round_trip() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    let u9 = h.join("P1", "u9", "+15550000009", MemberRole::PartnerAdmin).await;
    assert!(h.service.deactivate_team_member(&p1, &u9, &admin(), Some("break".into())).await.success);

    let missing = h.service.reactivate_team_member(&p1, &u9, &admin(), None).await;
    assert_eq!(missing.error_kind, Some(ErrorKind::ValidationError));
    let blank = h.service.reactivate_team_member(&p1, &u9, &admin(), Some("  ")).await;
    assert_eq!(blank.error_kind, Some(ErrorKind::ValidationError));

    // Any pending code for the partner will do, not only one for this phone.
    let code = h.code_for("P1", "+15557777777").await;
    let response = h
        .service
        .reactivate_team_member(&p1, &u9, &admin(), Some(&code))
        .await;
    assert!(response.success, "{}", response.message);
    // The member keeps their previous role.
    assert_eq!(response.payload.unwrap().role, MemberRole::PartnerAdmin);

    let member = h.member("P1", "u9").await;
    assert_eq!(member.status, MembershipStatus::Active);
    assert_eq!(member.suspended_at, None);
    assert_eq!(member.suspended_by, None);
    assert_eq!(member.suspension_reason, None);
    assert_eq!(member.reactivated_by, Some(admin()));
    let link = h.link("P1", "u9").await;
    assert_eq!(link.status, MembershipStatus::Active);
    assert_eq!(link.suspended_at, None);

    let claims = h.claims("u9").await;
    assert!(claims.has_partner(&p1));
    assert!(claims.is_active_partner(&p1));
    // The code is spent.
    assert!(h.pending(&code).await.is_none());
}

#[tokio::test]
async fn reactivation_preconditions() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    h.seed_partner("P2", "Globex").await;
    let u9 = h.join("P1", "u9", "+15550000009", MemberRole::Employee).await;

    let code = h.code_for("P1", "+15557777777").await;
    let active = h
        .service
        .reactivate_team_member(&p1, &u9, &admin(), Some(&code))
        .await;
    assert_eq!(active.error_kind, Some(ErrorKind::NotSuspended));

    assert!(h.service.deactivate_team_member(&p1, &u9, &admin(), None).await.success);

    let foreign = h.code_for("P2", "+15557777777").await;
    let wrong_partner = h
        .service
        .reactivate_team_member(&p1, &u9, &admin(), Some(&foreign))
        .await;
    assert_eq!(wrong_partner.error_kind, Some(ErrorKind::InvalidCode));
    assert!(h.pending(&foreign).await.is_some());

    h.backdate(&code).await;
    let expired = h
        .service
        .reactivate_team_member(&p1, &u9, &admin(), Some(&code))
        .await;
    assert_eq!(expired.error_kind, Some(ErrorKind::CodeExpired));
    assert!(h.pending(&code).await.is_none());
    assert_eq!(h.member("P1", "u9").await.status, MembershipStatus::Suspended);
}

#[tokio::test]
async fn role_update_rules() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    let u9 = h.join("P1", "u9", "+15550000009", MemberRole::Employee).await;

    let own = h
        .service
        .update_team_member_role(&p1, &u9, "partner_admin", &u9)
        .await;
    assert_eq!(own.error_kind, Some(ErrorKind::SelfActionForbidden));

    let bogus = h
        .service
        .update_team_member_role(&p1, &u9, "owner", &admin())
        .await;
    assert_eq!(bogus.error_kind, Some(ErrorKind::ValidationError));

    let promoted = h
        .service
        .update_team_member_role(&p1, &u9, "partner_admin", &admin())
        .await;
    assert!(promoted.success, "{}", promoted.message);
    let payload = promoted.payload.unwrap();
    assert_eq!(payload.previous_role, MemberRole::Employee);
    assert_eq!(payload.new_role, MemberRole::PartnerAdmin);

    assert_eq!(h.member("P1", "u9").await.role, MemberRole::PartnerAdmin);
    let link = h.link("P1", "u9").await;
    assert_eq!(link.role, MemberRole::PartnerAdmin);
    assert!(link.permissions.contains(&"members.manage".to_string()));
    assert_eq!(h.claims("u9").await.role.as_deref(), Some("partner_admin"));

    let notices = h.notifier.sent();
    let notice = notices
        .iter()
        .find(|n| n.kind == NoticeKind::RoleChanged)
        .unwrap();
    assert_eq!(notice.recipients, vec![Recipient::User(u9.clone())]);
    assert!(notice.channels.contains(&NoticeChannel::Email));

    let unchanged = h
        .service
        .update_team_member_role(&p1, &u9, "partner_admin", &admin())
        .await;
    assert!(unchanged.success);
    assert!(unchanged.message.contains("already"));
}

#[tokio::test]
async fn role_change_in_inactive_partner_keeps_claims_role() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    let p2 = h.seed_partner("P2", "Globex").await;
    let phone = "+15550000009";
    h.join("P1", "u9", phone, MemberRole::Employee).await;
    let u9 = h.join("P2", "u9", phone, MemberRole::Employee).await;
    assert!(h.claims("u9").await.is_active_partner(&p1));

    let response = h
        .service
        .update_team_member_role(&p2, &u9, "partner_admin", &admin())
        .await;
    assert!(response.success);
    let claims = h.claims("u9").await;
    assert!(claims.is_active_partner(&p1));
    assert_eq!(claims.role.as_deref(), Some("employee"));
}

#[tokio::test]
async fn transfer_tasks_between_members() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    let u1 = h.join("P1", "u1", "+15550000001", MemberRole::Employee).await;
    let u2 = h.join("P1", "u2", "+15550000002", MemberRole::Employee).await;
    let u3 = h.join("P1", "u3", "+15550000003", MemberRole::Employee).await;
    h.seed_task("P1", "t1", "u1", TaskStatus::Assigned).await;
    h.seed_task("P1", "t2", "u1", TaskStatus::InProgress).await;
    h.seed_task("P1", "t3", "u1", TaskStatus::Completed).await;

    let same = h.service.transfer_user_tasks(&p1, &u1, &u1, &admin()).await;
    assert_eq!(same.error_kind, Some(ErrorKind::ValidationError));

    assert!(h.service.deactivate_team_member(&p1, &u3, &admin(), None).await.success);
    let to_suspended = h.service.transfer_user_tasks(&p1, &u1, &u3, &admin()).await;
    assert_eq!(to_suspended.error_kind, Some(ErrorKind::ValidationError));

    let moved = h.service.transfer_user_tasks(&p1, &u1, &u2, &admin()).await;
    assert!(moved.success, "{}", moved.message);
    assert_eq!(moved.payload.unwrap().transferred, 2);

    let received = h.tasks_of("P1", "u2").await;
    assert_eq!(received.len(), 2);
    assert!(received
        .iter()
        .all(|t| t.transferred_from == Some(u1.clone()) && t.transferred_by == Some(admin())));
    assert_eq!(h.tasks_of("P1", "u1").await.len(), 1);

    assert!(h
        .notifier
        .sent()
        .iter()
        .any(|n| n.kind == NoticeKind::TasksTransferred
            && n.recipients == vec![Recipient::User(u2.clone())]));
}

#[tokio::test]
async fn member_reads() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    let u1 = h.join("P1", "u1", "+15550000001", MemberRole::Employee).await;
    h.join("P1", "u2", "+15550000002", MemberRole::Employee).await;
    assert!(h.service.deactivate_team_member(&p1, &u1, &admin(), None).await.success);

    let all = h.service.list_team_members(&p1, None).await.payload.unwrap();
    // admin1 plus the two who joined.
    assert_eq!(all.members.len(), 3);
    let suspended = h
        .service
        .list_team_members(&p1, Some(MembershipStatus::Suspended))
        .await
        .payload
        .unwrap();
    assert_eq!(suspended.members.len(), 1);
    assert_eq!(suspended.members[0].user_id, u1);

    let detail = h.service.get_team_member(&p1, &u1).await.payload.unwrap();
    assert_eq!(detail.member.status, MembershipStatus::Suspended);
    assert_eq!(detail.link.unwrap().status, MembershipStatus::Suspended);
}

#[tokio::test]
async fn reconcile_repairs_drifted_claims() {
    let h = TestHarness::new().await;
    let p1 = h.seed_partner("P1", "Acme").await;
    let u9 = h.join("P1", "u9", "+15550000009", MemberRole::Employee).await;

    // Simulate drift: claims written by something else that knows nothing
    // about P1 but carries a custom key.
    let mut drifted = crewdeck_identity::IdentityClaims::default();
    drifted
        .extra
        .insert("locale".into(), serde_json::json!("en-GB"));
    crewdeck_identity::IdentityProvider::set_claims(h.store.as_ref(), &u9, drifted, None)
        .await
        .unwrap();

    let response = h.service.reconcile_claims(&u9).await;
    assert!(response.success, "{}", response.message);
    let claims = h.claims("u9").await;
    assert!(claims.has_partner(&p1));
    assert!(claims.is_active_partner(&p1));
    assert_eq!(claims.extra.get("locale"), Some(&serde_json::json!("en-GB")));

    let shown = h.service.get_claims(&u9).await.payload.unwrap();
    assert_eq!(shown.claims, claims);
}
