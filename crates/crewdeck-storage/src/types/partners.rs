//! Partner (tenant organization) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PartnerId;

/// Partner record. Created by onboarding; read-only to membership code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub status: String,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}
