use std::sync::Arc;

use crewdeck_audit::{AuditEvent, AuditLog, AuditLogFilter};
use crewdeck_storage::PartnerId;

use crate::error::MembershipError;
use crate::metrics;
use crate::response::{CascadeFailure, CascadeStep};

/// Default and maximum page size for audit queries.
pub const DEFAULT_AUDIT_PAGE: u32 = 50;
pub const MAX_AUDIT_PAGE: u32 = 500;

/// Appends audit entries for membership mutations.
#[derive(Clone)]
pub struct AuditLogger {
    log: Arc<dyn AuditLog>,
}

impl AuditLogger {
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }

    /// Record an audit event. Failures are logged but do not fail the operation.
    pub async fn record(&self, event: AuditEvent) -> Result<(), CascadeFailure> {
        let action = event.action;
        if let Err(e) = self.log.record(event).await {
            tracing::warn!(action = %action, error = %e, "failed to record audit event");
            metrics::record_cascade_failure(CascadeStep::Audit.as_str());
            return Err(CascadeFailure {
                step: CascadeStep::Audit,
                message: e.to_string(),
            });
        }
        Ok(())
    }

    /// Entries for one partner, newest first.
    pub async fn query(
        &self,
        partner_id: &PartnerId,
        filter: AuditLogFilter,
    ) -> Result<Vec<AuditEvent>, MembershipError> {
        let limit = filter.limit.unwrap_or(DEFAULT_AUDIT_PAGE).min(MAX_AUDIT_PAGE);
        let filter = filter.partner_id(partner_id.clone()).limit(limit);
        self.log
            .query(filter)
            .await
            .map_err(|e| MembershipError::Execution(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewdeck_audit::{AuditAction, AuditLogError, MockAuditLog};
    use crewdeck_storage::UserId;

    fn event() -> AuditEvent {
        AuditEvent::builder(
            &UserId::from("admin"),
            &PartnerId::from("P1"),
            AuditAction::MemberDeactivate,
        )
        .resource("team_member", "u9")
        .build()
    }

    #[tokio::test]
    async fn record_failure_is_reported_not_raised() {
        let mut log = MockAuditLog::new();
        log.expect_record()
            .returning(|_| Err(AuditLogError::Database("locked".into())));
        let logger = AuditLogger::new(Arc::new(log));

        let failure = logger.record(event()).await.unwrap_err();
        assert_eq!(failure.step, CascadeStep::Audit);
        assert!(failure.message.contains("locked"));
    }

    #[tokio::test]
    async fn query_is_scoped_and_capped() {
        let mut log = MockAuditLog::new();
        log.expect_query()
            .withf(|f| f.partner_id == Some(PartnerId::from("P1")) && f.limit == Some(MAX_AUDIT_PAGE))
            .returning(|_| Ok(vec![]));
        let logger = AuditLogger::new(Arc::new(log));

        let filter = AuditLogFilter::new()
            .partner_id(PartnerId::from("P2"))
            .limit(10_000);
        let events = logger.query(&PartnerId::from("P1"), filter).await.unwrap();
        assert!(events.is_empty());
    }
}
