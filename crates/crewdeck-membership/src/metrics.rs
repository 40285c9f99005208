//! Counters for membership operations.
//!
//! Recorded through the `metrics` facade; installing an exporter is up to the
//! embedding binary.

use metrics::{counter, describe_counter};

/// Describe every counter this crate records.
pub fn describe_metrics() {
    describe_counter!(
        "crewdeck_membership_operations_total",
        "Membership operations by operation and outcome"
    );
    describe_counter!(
        "crewdeck_invitation_code_collisions_total",
        "Generated invitation codes that collided with a pending code"
    );
    describe_counter!(
        "crewdeck_claims_sync_conflicts_total",
        "Identity provider version conflicts retried by the claims synchronizer"
    );
    describe_counter!(
        "crewdeck_cascade_failures_total",
        "Best-effort side effects that failed after the primary write committed"
    );
}

/// Record a finished operation. `outcome` is one of success, degraded, failure.
pub fn record_operation(operation: &'static str, outcome: &'static str) {
    counter!(
        "crewdeck_membership_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_code_collision() {
    counter!("crewdeck_invitation_code_collisions_total").increment(1);
}

pub fn record_claims_conflict() {
    counter!("crewdeck_claims_sync_conflicts_total").increment(1);
}

pub fn record_cascade_failure(step: &'static str) {
    counter!("crewdeck_cascade_failures_total", "step" => step).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe_metrics();
        record_operation("deactivate", "success");
        record_code_collision();
        record_claims_conflict();
        record_cascade_failure("claims_sync");
    }
}
