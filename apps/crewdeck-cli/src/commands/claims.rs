use crewdeck_membership::ClaimsView;
use crewdeck_storage::UserId;

use crate::app::{App, CliResult};
use crate::output::emit;

fn render(view: &ClaimsView) {
    let claims = &view.claims;
    let partners: Vec<_> = claims.partner_ids.iter().map(|p| p.as_str()).collect();
    println!("User:     {}", view.user_id);
    println!("Partners: {}", if partners.is_empty() { "-".to_string() } else { partners.join(", ") });
    println!(
        "Active:   {}",
        claims.active_partner_id.as_ref().map_or("-", |p| p.as_str())
    );
    println!("Tenant:   {}", claims.active_tenant_id.as_ref().map_or("-", |t| t.as_str()));
    println!("Role:     {}", claims.role.as_deref().unwrap_or("-"));
}

pub async fn cmd_claims_show(app: &App, user: &str) -> CliResult<bool> {
    let response = app.service.get_claims(&UserId::from(user)).await;
    emit(app, &response, render)
}

pub async fn cmd_claims_reconcile(app: &App, user: &str) -> CliResult<bool> {
    let response = app.service.reconcile_claims(&UserId::from(user)).await;
    emit(app, &response, render)
}
