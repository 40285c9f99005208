//! Partner commands: create, show
//!
//! Partners normally come from onboarding; `create` seeds one locally along
//! with its first admin so the other commands have something to act on.

use chrono::Utc;
use crewdeck_storage::{
    MemberRole, MembershipStatus, Partner, PartnerId, Store, StoreError, TeamMember, TenantId,
    UserId, WorkspaceLink, WriteBatch,
};

use crate::app::{App, CliResult};

pub async fn cmd_partner_create(
    app: &App,
    id: &str,
    name: &str,
    plan: &str,
    admin: &str,
    admin_name: &str,
    tenant: Option<&str>,
) -> CliResult<bool> {
    let partner_id = PartnerId::from(id);
    match app.store.get_partner(&partner_id).await {
        Ok(_) => return Err(format!("partner '{id}' already exists").into()),
        Err(StoreError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let now = Utc::now();
    let admin_id = UserId::from(admin);
    let tenant_id = TenantId::from(tenant.unwrap_or(id));
    let partner = Partner {
        id: partner_id.clone(),
        name: name.to_string(),
        status: "active".to_string(),
        plan: plan.to_string(),
        created_at: now,
    };
    let member = TeamMember {
        partner_id: partner_id.clone(),
        user_id: admin_id.clone(),
        name: admin_name.to_string(),
        phone_number: None,
        email: None,
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
        user_id: admin_id.clone(),
        partner_id: partner_id.clone(),
        tenant_id,
        role: MemberRole::PartnerAdmin,
        status: MembershipStatus::Active,
        permissions: MemberRole::PartnerAdmin.default_permissions(),
        joined_at: now,
        suspended_at: None,
        updated_at: now,
    };
    app.store
        .commit(
            WriteBatch::new()
                .put_partner(partner.clone())
                .put_team_member(member)
                .put_workspace_link(link),
        )
        .await?;
    tracing::info!(partner_id = %partner_id, admin = %admin_id, "partner created");

    let claims = app.service.reconcile_claims(&admin_id).await;
    if app.json {
        println!("{}", serde_json::to_string_pretty(&partner)?);
    } else {
        println!("Partner created!\n");
        println!("ID:    {}", partner.id);
        println!("Name:  {}", partner.name);
        println!("Plan:  {}", partner.plan);
        println!("Admin: {} ({})", admin_id, admin_name);
    }
    if !claims.success {
        eprintln!("Warning: admin claims not updated: {}", claims.message);
    }
    Ok(true)
}

pub async fn cmd_partner_show(app: &App, id: &str) -> CliResult<bool> {
    let partner_id = PartnerId::from(id);
    let partner = match app.store.get_partner(&partner_id).await {
        Ok(partner) => partner,
        Err(StoreError::NotFound) => return Err(format!("partner '{id}' not found").into()),
        Err(e) => return Err(e.into()),
    };
    let members = app.store.list_team_members(&partner_id, None).await?;
    let active = members.iter().filter(|m| !m.is_suspended()).count();

    if app.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "partner": partner,
                "members": members.len(),
                "activeMembers": active,
            }))?
        );
    } else {
        println!("ID:      {}", partner.id);
        println!("Name:    {}", partner.name);
        println!("Status:  {}", partner.status);
        println!("Plan:    {}", partner.plan);
        println!("Created: {}", partner.created_at);
        println!("Members: {} ({} active)", members.len(), active);
    }
    Ok(true)
}
