//! Task commands: create, list, transfer
//!
//! Tasks belong to the task board; `create` and `list` exist so cascades can
//! be exercised and inspected from the command line.

use chrono::Utc;
use crewdeck_storage::{PartnerId, Store, Task, TaskId, TaskStatus, UserId, WriteBatch};

use crate::app::{App, CliResult};
use crate::output::emit;

pub async fn cmd_task_create(
    app: &App,
    title: &str,
    partner: &str,
    assignee: Option<&str>,
) -> CliResult<bool> {
    let now = Utc::now();
    let task = Task {
        id: TaskId::from(uuid::Uuid::now_v7().to_string()),
        partner_id: PartnerId::from(partner),
        title: title.to_string(),
        assignee: assignee.map(UserId::from),
        status: if assignee.is_some() {
            TaskStatus::Assigned
        } else {
            TaskStatus::Unassigned
        },
        revocation_reason: None,
        revoked_at: None,
        transferred_from: None,
        transferred_by: None,
        transferred_at: None,
        created_at: now,
        updated_at: now,
    };
    app.store
        .commit(WriteBatch::new().put_task(task.clone()))
        .await?;

    if app.json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        println!("Task created: {}", task.id);
    }
    Ok(true)
}

pub async fn cmd_task_list(
    app: &App,
    partner: &str,
    assignee: Option<&str>,
    statuses: &[String],
) -> CliResult<bool> {
    let statuses = statuses
        .iter()
        .map(|s| s.parse::<TaskStatus>())
        .collect::<Result<Vec<_>, _>>()?;
    let tasks = app
        .store
        .list_tasks(&PartnerId::from(partner), assignee.map(UserId::from), statuses)
        .await?;

    if app.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else if tasks.is_empty() {
        println!("No tasks found.");
    } else {
        for task in &tasks {
            let assignee = task.assignee.as_ref().map_or("-", |a| a.as_str());
            println!(
                "{:<38} {:<12} {:<16} {}",
                task.id, task.status, assignee, task.title
            );
        }
    }
    Ok(true)
}

pub async fn cmd_task_transfer(app: &App, partner: &str, from: &str, to: &str) -> CliResult<bool> {
    let actor = app.actor()?;
    let response = app
        .service
        .transfer_user_tasks(
            &PartnerId::from(partner),
            &UserId::from(from),
            &UserId::from(to),
            &actor,
        )
        .await;
    emit(app, &response, |_| {})
}
