//! Result envelopes handed back to callers of the membership core.

use crewdeck_storage::StoreError;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, MembershipError};

/// A best-effort step that runs after the authoritative write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStep {
    ClaimsSync,
    TaskRevocation,
    Audit,
    Notification,
}

impl CascadeStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeStep::ClaimsSync => "claims_sync",
            CascadeStep::TaskRevocation => "task_revocation",
            CascadeStep::Audit => "audit",
            CascadeStep::Notification => "notification",
        }
    }
}

/// One failed side effect of an otherwise successful operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeFailure {
    pub step: CascadeStep,
    pub message: String,
}

impl std::fmt::Display for CascadeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.step.as_str(), self.message)
    }
}

/// Value of a successful operation plus any side effects that failed.
#[derive(Clone, Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub failures: Vec<CascadeFailure>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            failures: Vec::new(),
        }
    }

    pub fn with_failures(value: T, failures: Vec<CascadeFailure>) -> Self {
        Self { value, failures }
    }

    /// The primary write succeeded but something after it did not.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed(&self, step: CascadeStep) -> bool {
        self.failures.iter().any(|f| f.step == step)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            failures: self.failures,
        }
    }
}

/// A refused operation, plus any side effects of the refusal that failed.
///
/// Accepting an expired code is refused but still flips the code to
/// `expired`; if that transition's audit entry cannot be written, the
/// failure travels back here.
#[derive(Debug)]
pub struct Rejection {
    pub error: MembershipError,
    pub failures: Vec<CascadeFailure>,
}

impl From<MembershipError> for Rejection {
    fn from(error: MembershipError) -> Self {
        Self {
            error,
            failures: Vec::new(),
        }
    }
}

impl From<StoreError> for Rejection {
    fn from(e: StoreError) -> Self {
        MembershipError::from(e).into()
    }
}

/// `{success, message, error_kind?, warnings[], ...payload}`
#[derive(Clone, Debug, Serialize)]
pub struct OperationResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CascadeFailure>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T> OperationResponse<T> {
    /// Build from an operation result. `message` renders the success text.
    pub fn from_result(
        result: Result<Outcome<T>, impl Into<Rejection>>,
        message: impl FnOnce(&T) -> String,
    ) -> Self {
        match result {
            Ok(outcome) => Self::ok(message(&outcome.value), outcome),
            Err(e) => Self::rejected(e.into()),
        }
    }

    pub fn ok(message: String, outcome: Outcome<T>) -> Self {
        let error_kind = outcome
            .failed(CascadeStep::ClaimsSync)
            .then_some(ErrorKind::ClaimsSyncFailed);
        let message = if outcome.is_degraded() {
            let steps: Vec<_> = outcome.failures.iter().map(|f| f.step.as_str()).collect();
            format!("{message} (follow-up steps failed: {})", steps.join(", "))
        } else {
            message
        };
        Self {
            success: true,
            message,
            error_kind,
            warnings: outcome.failures,
            payload: Some(outcome.value),
        }
    }

    pub fn failed(error: &MembershipError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            error_kind: Some(error.kind()),
            warnings: Vec::new(),
            payload: None,
        }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            warnings: rejection.failures,
            ..Self::failed(&rejection.error)
        }
    }

    /// Metric label for this response.
    pub fn outcome_label(&self) -> &'static str {
        match (self.success, self.warnings.is_empty()) {
            (false, _) => "failure",
            (true, true) => "success",
            (true, false) => "degraded",
        }
    }
}

/// Per-item result of a bulk run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemResult {
    pub index: usize,
    /// User id, or phone number for bulk invitations.
    pub target: String,
    pub action: String,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CascadeFailure>,
}

impl BulkItemResult {
    pub fn passed(index: usize, target: String, action: &str, message: impl Into<String>) -> Self {
        Self {
            index,
            target,
            action: action.to_string(),
            success: true,
            message: message.into(),
            error_kind: None,
            warnings: Vec::new(),
        }
    }

    pub fn rejected(index: usize, target: String, action: &str, error: &MembershipError) -> Self {
        Self {
            index,
            target,
            action: action.to_string(),
            success: false,
            message: error.to_string(),
            error_kind: Some(error.kind()),
            warnings: Vec::new(),
        }
    }

    /// A valid item held back because another item in its batch failed
    /// validation.
    pub fn withheld(self) -> Self {
        Self {
            success: false,
            message: "valid; not executed because the batch was rejected".to_string(),
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BulkSummary {
    pub fn of(results: &[BulkItemResult]) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
        }
    }
}

/// `{success, message, dry_run, executed, warnings[], results[], summary}`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulkResponse {
    pub success: bool,
    pub message: String,
    pub dry_run: bool,
    pub executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Batch-level side effects that failed, such as the batch audit entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CascadeFailure>,
    pub results: Vec<BulkItemResult>,
    pub summary: BulkSummary,
}

impl BulkResponse {
    /// The batch as a whole was refused before any item ran.
    pub fn aborted(error: &MembershipError, dry_run: bool) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            dry_run,
            executed: false,
            error_kind: Some(error.kind()),
            warnings: Vec::new(),
            results: Vec::new(),
            summary: BulkSummary::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Payload {
        user_id: String,
        tasks_revoked: usize,
    }

    #[test]
    fn test_payload_is_flattened() {
        let response = OperationResponse::ok(
            "Member deactivated".into(),
            Outcome::new(Payload {
                user_id: "u9".into(),
                tasks_revoked: 2,
            }),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["userId"], "u9");
        assert_eq!(json["tasksRevoked"], 2);
        assert!(json.get("error_kind").is_none());
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn test_degraded_success_flags_claims_failure() {
        let outcome = Outcome::with_failures(
            (),
            vec![CascadeFailure {
                step: CascadeStep::ClaimsSync,
                message: "identity provider unavailable".into(),
            }],
        );
        let response = OperationResponse::ok("Member deactivated".into(), outcome);
        assert!(response.success);
        assert_eq!(response.error_kind, Some(ErrorKind::ClaimsSyncFailed));
        assert!(response.message.contains("claims_sync"));
        assert_eq!(response.outcome_label(), "degraded");
    }

    #[test]
    fn test_failure_response() {
        let response: OperationResponse<()> =
            OperationResponse::failed(&MembershipError::CodeExpired);
        assert!(!response.success);
        assert_eq!(response.error_kind, Some(ErrorKind::CodeExpired));
        assert!(response.payload.is_none());
        assert_eq!(response.outcome_label(), "failure");
    }

    #[test]
    fn test_rejection_keeps_side_effect_failures() {
        let rejection = Rejection {
            error: MembershipError::CodeExpired,
            failures: vec![CascadeFailure {
                step: CascadeStep::Audit,
                message: "audit store down".into(),
            }],
        };
        let response: OperationResponse<()> = OperationResponse::rejected(rejection);
        assert!(!response.success);
        assert_eq!(response.error_kind, Some(ErrorKind::CodeExpired));
        assert_eq!(response.warnings.len(), 1);
        assert_eq!(response.warnings[0].step, CascadeStep::Audit);
    }

    #[test]
    fn test_withheld_item_counts_as_failed() {
        let results = vec![
            BulkItemResult::passed(0, "u1".into(), "deactivate", "valid").withheld(),
            BulkItemResult::rejected(1, "u2".into(), "deactivate", &MembershipError::NotFound("member")),
        ];
        assert!(!results[0].success);
        assert!(results[0].error_kind.is_none());
        assert!(results[0].message.contains("not executed"));
        let summary = BulkSummary::of(&results);
        assert_eq!(summary, BulkSummary { total: 2, successful: 0, failed: 2 });
    }

    #[test]
    fn test_bulk_summary() {
        let results = vec![
            BulkItemResult::passed(0, "u1".into(), "deactivate", "ok"),
            BulkItemResult::rejected(1, "u2".into(), "deactivate", &MembershipError::NotFound("member")),
        ];
        let summary = BulkSummary::of(&results);
        assert_eq!(summary, BulkSummary { total: 2, successful: 1, failed: 1 });
    }
}
