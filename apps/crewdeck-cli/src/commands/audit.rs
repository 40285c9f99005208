//! Audit log commands: list

use crewdeck_audit::{AuditAction, AuditLogFilter};
use crewdeck_storage::{PartnerId, UserId};

use crate::app::{App, CliResult};
use crate::output::emit;

pub async fn cmd_audit_list(
    app: &App,
    partner: &str,
    action: Option<&str>,
    user: Option<&str>,
    limit: Option<u32>,
    offset: Option<u32>,
) -> CliResult<bool> {
    let mut filter = AuditLogFilter::new();
    if let Some(action) = action {
        filter = filter.action(action.parse::<AuditAction>()?);
    }
    if let Some(user) = user {
        filter = filter.target_user_id(UserId::from(user));
    }
    if let Some(limit) = limit {
        filter = filter.limit(limit);
    }
    if let Some(offset) = offset {
        filter = filter.offset(offset);
    }

    let response = app.service.query_audit(&PartnerId::from(partner), filter).await;
    emit(app, &response, |audit| {
        for entry in &audit.entries {
            println!("ID:        {}", entry.id.0);
            println!("Timestamp: {}", entry.timestamp);
            println!("Action:    {}", entry.action.as_str());
            println!("By:        {}", entry.performed_by);
            if let Some(target) = &entry.target_user_id {
                println!("Target:    {target}");
            }
            println!("Resource:  {} ({})", entry.resource_type, entry.resource_id);
            println!("Result:    {}", entry.result);
            if let Some(reason) = &entry.reason {
                println!("Reason:    {reason}");
            }
            println!();
        }
    })
}
