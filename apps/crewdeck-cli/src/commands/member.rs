//! Member commands: list, show, deactivate, reactivate, role

use crewdeck_storage::{MembershipStatus, PartnerId, UserId};

use crate::app::{App, CliResult};
use crate::output::emit;

pub async fn cmd_member_list(app: &App, partner: &str, status: Option<&str>) -> CliResult<bool> {
    let status = status.map(str::parse::<MembershipStatus>).transpose()?;
    let response = app
        .service
        .list_team_members(&PartnerId::from(partner), status)
        .await;
    emit(app, &response, |list| {
        for member in &list.members {
            println!(
                "{:<20} {:<24} {:<14} {}",
                member.user_id, member.name, member.role, member.status
            );
        }
    })
}

pub async fn cmd_member_show(app: &App, user: &str, partner: &str) -> CliResult<bool> {
    let response = app
        .service
        .get_team_member(&PartnerId::from(partner), &UserId::from(user))
        .await;
    emit(app, &response, |detail| {
        let member = &detail.member;
        println!("User:    {}", member.user_id);
        println!("Name:    {}", member.name);
        if let Some(phone) = &member.phone_number {
            println!("Phone:   {phone}");
        }
        println!("Role:    {}", member.role);
        println!("Status:  {}", member.status);
        if let Some(at) = member.suspended_at {
            println!("Suspended: {at}");
            if let Some(reason) = &member.suspension_reason {
                println!("Reason:    {reason}");
            }
        }
        if let Some(link) = &detail.link {
            println!("Tenant:  {}", link.tenant_id);
            println!("Perms:   {}", link.permissions.join(", "));
        }
    })
}

pub async fn cmd_member_deactivate(
    app: &App,
    user: &str,
    partner: &str,
    reason: Option<String>,
) -> CliResult<bool> {
    let actor = app.actor()?;
    let response = app
        .service
        .deactivate_team_member(&PartnerId::from(partner), &UserId::from(user), &actor, reason)
        .await;
    emit(app, &response, |_| {})
}

pub async fn cmd_member_reactivate(
    app: &App,
    user: &str,
    partner: &str,
    code: Option<&str>,
) -> CliResult<bool> {
    let actor = app.actor()?;
    let response = app
        .service
        .reactivate_team_member(&PartnerId::from(partner), &UserId::from(user), &actor, code)
        .await;
    emit(app, &response, |_| {})
}

pub async fn cmd_member_role(app: &App, user: &str, role: &str, partner: &str) -> CliResult<bool> {
    let actor = app.actor()?;
    let response = app
        .service
        .update_team_member_role(&PartnerId::from(partner), &UserId::from(user), role, &actor)
        .await;
    emit(app, &response, |_| {})
}
