//! Membership configuration.
//!
//! Loaded from environment variables:
//!
//! ```bash
//! CREWDECK_INVITE_EXPIRY_HOURS=72         # bulk/email invitation lifetime
//! CREWDECK_CODE_GENERATION_ATTEMPTS=5     # collision retries per issued code
//! CREWDECK_BULK_MAX_ITEMS=50              # bulk batch size cap
//! CREWDECK_CLAIMS_SYNC_ATTEMPTS=3         # retries on claims version conflicts
//! CREWDECK_WRITE_BATCH_LIMIT=450          # ops per atomic task-cascade batch
//! ```

use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_INVITE_EXPIRY_HOURS: u32 = 72;
pub const MAX_INVITE_EXPIRY_HOURS: u32 = 720;
pub const DEFAULT_CODE_GENERATION_ATTEMPTS: u32 = 5;
pub const DEFAULT_BULK_MAX_ITEMS: usize = 50;
pub const DEFAULT_CLAIMS_SYNC_ATTEMPTS: u32 = 3;
pub const DEFAULT_WRITE_BATCH_LIMIT: usize = 450;

/// Tunables for the membership core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipConfig {
    /// Default lifetime of invitations issued outside the code path.
    pub invite_expiry_hours: u32,
    /// How many fresh codes to try before giving up on a collision.
    pub code_generation_attempts: u32,
    /// Largest accepted bulk batch.
    pub bulk_max_items: usize,
    /// Read-modify-write attempts against the identity provider.
    pub claims_sync_attempts: u32,
    /// Largest atomic batch used by task cascades.
    pub write_batch_limit: usize,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            invite_expiry_hours: DEFAULT_INVITE_EXPIRY_HOURS,
            code_generation_attempts: DEFAULT_CODE_GENERATION_ATTEMPTS,
            bulk_max_items: DEFAULT_BULK_MAX_ITEMS,
            claims_sync_attempts: DEFAULT_CLAIMS_SYNC_ATTEMPTS,
            write_batch_limit: DEFAULT_WRITE_BATCH_LIMIT,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid number for {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be between {min} and {max}, got {value}")]
    OutOfRange {
        var: &'static str,
        value: String,
        min: u64,
        max: u64,
    },
}

fn read<T>(var: &'static str, default: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Copy + Into<u64>,
{
    let raw = match env::var(var) {
        Ok(raw) => raw,
        Err(_) => return Ok(default),
    };
    let value = raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.clone(),
    })?;
    if !range.contains(&value) {
        return Err(ConfigError::OutOfRange {
            var,
            value: raw,
            min: (*range.start()).into(),
            max: (*range.end()).into(),
        });
    }
    Ok(value)
}

impl MembershipConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let invite_expiry_hours = read(
            "CREWDECK_INVITE_EXPIRY_HOURS",
            DEFAULT_INVITE_EXPIRY_HOURS,
            1..=MAX_INVITE_EXPIRY_HOURS,
        )?;
        let code_generation_attempts = read(
            "CREWDECK_CODE_GENERATION_ATTEMPTS",
            DEFAULT_CODE_GENERATION_ATTEMPTS,
            1..=20,
        )?;
        let bulk_max_items = read(
            "CREWDECK_BULK_MAX_ITEMS",
            DEFAULT_BULK_MAX_ITEMS as u32,
            1..=500,
        )? as usize;
        let claims_sync_attempts = read(
            "CREWDECK_CLAIMS_SYNC_ATTEMPTS",
            DEFAULT_CLAIMS_SYNC_ATTEMPTS,
            1..=10,
        )?;
        // Document stores commonly cap a batch at 500 writes.
        let write_batch_limit = read(
            "CREWDECK_WRITE_BATCH_LIMIT",
            DEFAULT_WRITE_BATCH_LIMIT as u32,
            1..=500,
        )? as usize;

        Ok(Self {
            invite_expiry_hours,
            code_generation_attempts,
            bulk_max_items,
            claims_sync_attempts,
            write_batch_limit,
        })
    }
}
