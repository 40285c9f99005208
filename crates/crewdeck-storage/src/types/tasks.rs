//! Task records, as far as membership cascades touch them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PartnerId, TaskId, TaskStatus, UserId};

/// Task record. Only assignee, status, and revocation/transfer metadata are
/// written by membership cascades.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub partner_id: PartnerId,
    pub title: String,
    pub assignee: Option<UserId>,
    pub status: TaskStatus,
    pub revocation_reason: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub transferred_from: Option<UserId>,
    pub transferred_by: Option<UserId>,
    pub transferred_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
