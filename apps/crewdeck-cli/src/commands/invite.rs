//! Invitation commands: create, bulk, accept, show, list, cancel

use std::path::Path;

use crewdeck_membership::{InvitationExpiry, InvitationRequest, Invitee};
use crewdeck_storage::{InvitationId, InvitationStatus, MemberRole, PartnerId, TenantId, UserId};

use crate::app::{App, CliResult};
use crate::output::{emit, emit_bulk};

fn tenant_or_partner(tenant: Option<&str>, partner: &str) -> TenantId {
    TenantId::from(tenant.unwrap_or(partner))
}

pub async fn cmd_invite_create(
    app: &App,
    partner: &str,
    tenant: Option<&str>,
    phone: &str,
    name: &str,
    role: &str,
    hours: Option<u32>,
) -> CliResult<bool> {
    let role: MemberRole = role.parse()?;
    let invited_by = app.actor()?;
    let request = InvitationRequest {
        phone_number: phone.to_string(),
        name: name.to_string(),
        partner_id: PartnerId::from(partner),
        tenant_id: tenant_or_partner(tenant, partner),
        role,
        invited_by,
        expiry: hours.map_or(InvitationExpiry::Code, InvitationExpiry::Hours),
    };
    let response = app.service.issue_invitation(request).await;
    emit(app, &response, |issued| {
        println!("Invitation created!\n");
        println!("Code:    {}", issued.code);
        println!("ID:      {}", issued.invitation_id);
        println!("Partner: {}", issued.partner_name);
        println!("Expires: {}\n", issued.expires_at);
    })
}

pub async fn cmd_invite_bulk(
    app: &App,
    file: &Path,
    partner: &str,
    tenant: Option<&str>,
    hours: Option<u32>,
) -> CliResult<bool> {
    let invited_by = app.actor()?;
    let raw = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let invitees: Vec<Invitee> = serde_json::from_str(&raw)?;
    let response = app
        .service
        .invite_many(
            &PartnerId::from(partner),
            &tenant_or_partner(tenant, partner),
            &invited_by,
            invitees,
            hours,
        )
        .await;
    emit_bulk(app, &response)
}

pub async fn cmd_invite_accept(app: &App, code: &str, phone: &str, user: &str) -> CliResult<bool> {
    let response = app
        .service
        .accept_invitation_by_code(code, phone, &UserId::from(user))
        .await;
    emit(app, &response, |accepted| {
        println!("Partner: {} ({})", accepted.partner_name, accepted.partner_id);
        println!("Role:    {}", accepted.role);
        if let Some(active) = &accepted.active_partner_id {
            println!("Active:  {active}");
        }
    })
}

pub async fn cmd_invite_show(app: &App, code: &str) -> CliResult<bool> {
    let response = app.service.get_invitation_by_code(code).await;
    emit(app, &response, |preview| {
        println!("Code:    {}", preview.code);
        println!("Partner: {} ({})", preview.partner_name, preview.partner_id);
        println!("Name:    {}", preview.name);
        println!("Role:    {}", preview.role);
        println!("Expires: {}", preview.expires_at);
    })
}

pub async fn cmd_invite_list(app: &App, partner: &str, status: Option<&str>) -> CliResult<bool> {
    let status = status.map(str::parse::<InvitationStatus>).transpose()?;
    let response = app
        .service
        .list_invitations(&PartnerId::from(partner), status)
        .await;
    emit(app, &response, |list| {
        for invitation in &list.invitations {
            println!("ID:      {}", invitation.id);
            println!("Code:    {}", invitation.code);
            println!("Phone:   {} ({})", invitation.phone_number, invitation.name);
            println!("Role:    {}", invitation.role);
            println!("Status:  {}", invitation.status);
            println!("Expires: {}\n", invitation.expires_at);
        }
    })
}

pub async fn cmd_invite_cancel(app: &App, id: &str, partner: &str) -> CliResult<bool> {
    let invitation_id: InvitationId = id.parse()?;
    let cancelled_by = app.actor()?;
    let response = app
        .service
        .cancel_invitation(&invitation_id, &PartnerId::from(partner), &cancelled_by)
        .await;
    emit(app, &response, |_| {})
}
