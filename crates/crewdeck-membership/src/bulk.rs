//! Validate-then-execute batches of per-member actions.
//!
//! Validation runs the same checks as the single-item operations without
//! writing anything. One invalid item rejects the whole batch; a dry run stops
//! after validation. During execution each item runs on its own and a failing
//! item does not affect the others.

use chrono::Utc;
use crewdeck_audit::{AuditAction, AuditEvent, AuditResult};
use crewdeck_storage::{PartnerId, UserId};
use serde::{Deserialize, Serialize};

use crate::audit::AuditLogger;
use crate::checks;
use crate::error::MembershipError;
use crate::lifecycle::MembershipLifecycleManager;
use crate::response::{BulkItemResult, BulkResponse, BulkSummary, Outcome, Rejection};
use crate::tasks::TaskCascadeReassigner;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Deactivate,
    Reactivate,
    UpdateRole,
    TransferTasks,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Deactivate => "deactivate",
            BulkAction::Reactivate => "reactivate",
            BulkAction::UpdateRole => "update_role",
            BulkAction::TransferTasks => "transfer_tasks",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItem {
    pub user_id: UserId,
    pub action: BulkAction,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub invitation_code: Option<String>,
    #[serde(default)]
    pub new_role: Option<String>,
    #[serde(default)]
    pub transfer_to_user_id: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub partner_id: PartnerId,
    pub performed_by: UserId,
    pub items: Vec<BulkItem>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Clone)]
pub struct BulkOperationCoordinator {
    lifecycle: MembershipLifecycleManager,
    tasks: TaskCascadeReassigner,
    audit: AuditLogger,
    max_items: usize,
}

impl BulkOperationCoordinator {
    pub fn new(
        lifecycle: MembershipLifecycleManager,
        tasks: TaskCascadeReassigner,
        audit: AuditLogger,
        max_items: usize,
    ) -> Self {
        Self {
            lifecycle,
            tasks,
            audit,
            max_items,
        }
    }

    /// Run a batch. `Err` only when the batch as a whole cannot be processed
    /// (empty, oversized, or the store is unreachable during validation).
    pub async fn run(&self, request: BulkRequest) -> Result<BulkResponse, MembershipError> {
        if request.items.is_empty() {
            return Err(MembershipError::validation("bulk request has no items"));
        }
        if request.items.len() > self.max_items {
            return Err(MembershipError::validation(format!(
                "at most {} items per bulk request, got {}",
                self.max_items,
                request.items.len()
            )));
        }

        let mut validation = Vec::with_capacity(request.items.len());
        for (index, item) in request.items.iter().enumerate() {
            let target = item.user_id.to_string();
            let action = item.action.as_str();
            match self.validate_item(&request, item).await {
                Ok(()) => validation.push(BulkItemResult::passed(index, target, action, "valid")),
                Err(e) if e.is_execution() => return Err(e),
                Err(e) => validation.push(BulkItemResult::rejected(index, target, action, &e)),
            }
        }

        let summary = BulkSummary::of(&validation);
        if summary.failed > 0 {
            tracing::info!(
                partner_id = %request.partner_id,
                invalid = summary.failed,
                total = summary.total,
                "bulk request rejected by validation"
            );
            // Nothing ran, so no item succeeded.
            let results: Vec<BulkItemResult> = validation
                .into_iter()
                .map(|r| if r.success { r.withheld() } else { r })
                .collect();
            return Ok(BulkResponse {
                success: false,
                message: format!(
                    "Validation failed for {} of {} items; nothing was executed",
                    summary.failed, summary.total
                ),
                dry_run: request.dry_run,
                executed: false,
                error_kind: Some(crate::error::ErrorKind::ValidationError),
                warnings: Vec::new(),
                summary: BulkSummary::of(&results),
                results,
            });
        }
        if request.dry_run {
            return Ok(BulkResponse {
                success: true,
                message: format!("Dry run: all {} items would succeed", summary.total),
                dry_run: true,
                executed: false,
                error_kind: None,
                warnings: Vec::new(),
                results: validation,
                summary,
            });
        }

        let mut results = Vec::with_capacity(request.items.len());
        for (index, item) in request.items.iter().enumerate() {
            let target = item.user_id.to_string();
            let action = item.action.as_str();
            let result = match self.execute_item(&request, item).await {
                Ok(outcome) => {
                    let mut result = BulkItemResult::passed(index, target, action, outcome.value);
                    result.warnings = outcome.failures;
                    result
                }
                Err(rejection) => {
                    tracing::warn!(
                        partner_id = %request.partner_id,
                        user_id = %item.user_id,
                        action,
                        error = %rejection.error,
                        "bulk item failed"
                    );
                    let mut result = BulkItemResult::rejected(index, target, action, &rejection.error);
                    result.warnings = rejection.failures;
                    result
                }
            };
            results.push(result);
        }

        let summary = BulkSummary::of(&results);
        let mut warnings = Vec::new();
        if let Err(f) = self
            .audit
            .record(
                AuditEvent::builder(&request.performed_by, &request.partner_id, AuditAction::BulkExecute)
                    .resource("bulk_operation", uuid::Uuid::now_v7().to_string())
                    .result(if summary.failed == 0 {
                        AuditResult::Success
                    } else {
                        AuditResult::Degraded
                    })
                    .details(serde_json::json!({
                        "total": summary.total,
                        "successful": summary.successful,
                        "failed": summary.failed,
                        "items": request
                            .items
                            .iter()
                            .map(|i| serde_json::json!({ "userId": i.user_id, "action": i.action }))
                            .collect::<Vec<_>>(),
                    }))
                    .build(),
            )
            .await
        {
            warnings.push(f);
        }

        Ok(BulkResponse {
            success: summary.failed == 0,
            message: format!(
                "Executed {} items: {} succeeded, {} failed",
                summary.total, summary.successful, summary.failed
            ),
            dry_run: false,
            executed: true,
            error_kind: None,
            warnings,
            results,
            summary,
        })
    }

    async fn validate_item(
        &self,
        request: &BulkRequest,
        item: &BulkItem,
    ) -> Result<(), MembershipError> {
        let partner_id = &request.partner_id;
        match item.action {
            BulkAction::Deactivate => {
                self.lifecycle
                    .check_deactivate(partner_id, &item.user_id, &request.performed_by)
                    .await?;
            }
            BulkAction::Reactivate => {
                let (_, invitation) = self
                    .lifecycle
                    .check_reactivate(partner_id, &item.user_id, item.invitation_code.as_deref())
                    .await?;
                checks::ensure_unexpired(&invitation, Utc::now())?;
            }
            BulkAction::UpdateRole => {
                checks::parse_role(checks::require(item.new_role.as_deref(), "new role")?)?;
                self.lifecycle
                    .check_role_update(partner_id, &item.user_id, &request.performed_by)
                    .await?;
            }
            BulkAction::TransferTasks => {
                let to = item
                    .transfer_to_user_id
                    .as_ref()
                    .ok_or_else(|| MembershipError::validation("transfer target is required"))?;
                self.tasks
                    .check_transfer(partner_id, &item.user_id, to)
                    .await?;
            }
        }
        Ok(())
    }

    async fn execute_item(
        &self,
        request: &BulkRequest,
        item: &BulkItem,
    ) -> Result<Outcome<String>, Rejection> {
        let partner_id = &request.partner_id;
        let by = &request.performed_by;
        match item.action {
            BulkAction::Deactivate => Ok(self
                .lifecycle
                .deactivate_team_member(partner_id, &item.user_id, by, item.reason.clone())
                .await?
                .map(|d| format!("deactivated; {} tasks revoked", d.tasks_revoked))),
            BulkAction::Reactivate => Ok(self
                .lifecycle
                .reactivate_team_member(partner_id, &item.user_id, by, item.invitation_code.as_deref())
                .await?
                .map(|r| format!("reactivated as {}", r.role))),
            BulkAction::UpdateRole => {
                let role = checks::parse_role(checks::require(item.new_role.as_deref(), "new role")?)?;
                Ok(self
                    .lifecycle
                    .update_team_member_role(partner_id, &item.user_id, role, by)
                    .await?
                    .map(|r| format!("role changed from {} to {}", r.previous_role, r.new_role)))
            }
            BulkAction::TransferTasks => {
                let to = item
                    .transfer_to_user_id
                    .as_ref()
                    .ok_or_else(|| MembershipError::validation("transfer target is required"))?;
                Ok(self
                    .tasks
                    .transfer_user_tasks(partner_id, &item.user_id, to, by)
                    .await?
                    .map(|t| format!("{} tasks transferred to {}", t.transferred, t.to_user_id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_request_deserializes_camel_case() {
        let raw = serde_json::json!({
            "partnerId": "P1",
            "performedBy": "admin1",
            "items": [
                {"userId": "u1", "action": "deactivate", "reason": "left"},
                {"userId": "u2", "action": "update_role", "newRole": "partner_admin"},
                {"userId": "u3", "action": "transfer_tasks", "transferToUserId": "u4"}
            ]
        });
        let request: BulkRequest = serde_json::from_value(raw).unwrap();
        assert!(!request.dry_run);
        assert_eq!(request.items.len(), 3);
        assert_eq!(request.items[1].action, BulkAction::UpdateRole);
        assert_eq!(request.items[2].transfer_to_user_id, Some(UserId::from("u4")));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let raw = serde_json::json!({"userId": "u1", "action": "delete"});
        assert!(serde_json::from_value::<BulkItem>(raw).is_err());
    }
}
