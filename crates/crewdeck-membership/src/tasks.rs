//! Task revocation and transfer when a membership changes.

use std::sync::Arc;

use chrono::Utc;
use crewdeck_audit::{AuditAction, AuditEvent};
use crewdeck_notify::{NoticeKind, Recipient};
use crewdeck_storage::{
    PartnerId, Store, Task, TaskStatus, TeamMember, UserId, WriteBatch,
};
use serde::{Deserialize, Serialize};

use crate::audit::AuditLogger;
use crate::checks;
use crate::error::MembershipError;
use crate::notices::Notices;
use crate::response::Outcome;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksTransferred {
    pub partner_id: PartnerId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub transferred: usize,
}

#[derive(Clone)]
pub struct TaskCascadeReassigner {
    store: Arc<dyn Store>,
    audit: AuditLogger,
    notices: Notices,
    write_batch_limit: usize,
}

impl TaskCascadeReassigner {
    pub fn new(
        store: Arc<dyn Store>,
        audit: AuditLogger,
        notices: Notices,
        write_batch_limit: usize,
    ) -> Self {
        Self {
            store,
            audit,
            notices,
            write_batch_limit: write_batch_limit.max(1),
        }
    }

    async fn open_tasks(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
    ) -> Result<Vec<Task>, MembershipError> {
        Ok(self
            .store
            .list_tasks(partner_id, Some(user_id.clone()), TaskStatus::OPEN.to_vec())
            .await?)
    }

    /// Commit tasks in chunks of at most `write_batch_limit` writes.
    async fn write_chunked(&self, tasks: Vec<Task>) -> Result<(), MembershipError> {
        for chunk in tasks.chunks(self.write_batch_limit) {
            let mut batch = WriteBatch::new();
            for task in chunk {
                batch = batch.put_task(task.clone());
            }
            self.store.commit(batch).await?;
        }
        Ok(())
    }

    /// Unassign every open task `user_id` holds in `partner_id`.
    ///
    /// Returns how many tasks were revoked. Safe to re-run: tasks already
    /// revoked are no longer open.
    pub async fn revoke_user_tasks(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
        performed_by: &UserId,
        reason: &str,
    ) -> Result<Outcome<usize>, MembershipError> {
        let now = Utc::now();
        let mut tasks = self.open_tasks(partner_id, user_id).await?;
        if tasks.is_empty() {
            return Ok(Outcome::new(0));
        }
        for task in &mut tasks {
            task.assignee = None;
            task.status = TaskStatus::Unassigned;
            task.revocation_reason = Some(reason.to_string());
            task.revoked_at = Some(now);
            task.updated_at = now;
        }
        let count = tasks.len();
        let task_ids: Vec<String> = tasks.iter().map(|t| t.id.to_string()).collect();
        self.write_chunked(tasks).await?;

        tracing::info!(partner_id = %partner_id, user_id = %user_id, count, "revoked open tasks");
        let mut failures = Vec::new();
        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(performed_by, partner_id, AuditAction::TasksRevoke)
                    .target_user(Some(user_id))
                    .resource("tasks", user_id.as_str())
                    .reason(Some(reason.to_string()))
                    .details(serde_json::json!({ "count": count, "taskIds": task_ids }))
                    .build(),
            )
            .await
        {
            failures.push(f);
        }
        Ok(Outcome::with_failures(count, failures))
    }

    /// Preconditions for a transfer; returns the receiving member.
    pub async fn check_transfer(
        &self,
        partner_id: &PartnerId,
        from_user_id: &UserId,
        to_user_id: &UserId,
    ) -> Result<TeamMember, MembershipError> {
        if from_user_id == to_user_id {
            return Err(MembershipError::validation(
                "cannot transfer tasks to the same member",
            ));
        }
        checks::load_membership(self.store.as_ref(), partner_id, from_user_id).await?;
        let receiver = checks::load_membership(self.store.as_ref(), partner_id, to_user_id).await?;
        if receiver.is_suspended() {
            return Err(MembershipError::validation(format!(
                "cannot transfer tasks to suspended member {to_user_id}"
            )));
        }
        Ok(receiver)
    }

    /// Move every open task from one member to another within a partner.
    pub async fn transfer_user_tasks(
        &self,
        partner_id: &PartnerId,
        from_user_id: &UserId,
        to_user_id: &UserId,
        performed_by: &UserId,
    ) -> Result<Outcome<TasksTransferred>, MembershipError> {
        self.check_transfer(partner_id, from_user_id, to_user_id)
            .await?;

        let now = Utc::now();
        let mut tasks = self.open_tasks(partner_id, from_user_id).await?;
        for task in &mut tasks {
            task.assignee = Some(to_user_id.clone());
            task.transferred_from = Some(from_user_id.clone());
            task.transferred_by = Some(performed_by.clone());
            task.transferred_at = Some(now);
            task.updated_at = now;
        }
        let transferred = tasks.len();
        self.write_chunked(tasks).await?;

        tracing::info!(
            partner_id = %partner_id,
            from = %from_user_id,
            to = %to_user_id,
            transferred,
            "transferred tasks"
        );

        let mut failures = Vec::new();
        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(performed_by, partner_id, AuditAction::TasksTransfer)
                    .target_user(Some(from_user_id))
                    .resource("tasks", from_user_id.as_str())
                    .details(serde_json::json!({
                        "toUserId": to_user_id,
                        "count": transferred,
                    }))
                    .build(),
            )
            .await
        {
            failures.push(f);
        }
        if transferred > 0 {
            if let Err(f) = self
                .notices
                .send(
                    NoticeKind::TasksTransferred,
                    partner_id,
                    vec![Recipient::User(to_user_id.clone())],
                    serde_json::json!({ "fromUserId": from_user_id, "count": transferred }),
                )
                .await
            {
                failures.push(f);
            }
        }

        Ok(Outcome::with_failures(
            TasksTransferred {
                partner_id: partner_id.clone(),
                from_user_id: from_user_id.clone(),
                to_user_id: to_user_id.clone(),
                transferred,
            },
            failures,
        ))
    }
}
