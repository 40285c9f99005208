//! Row decoding and column encoding shared by the store, audit log and claims tables.
//!
//! Timestamps are stored as unix milliseconds; list-valued columns as JSON text.

use chrono::{DateTime, Utc};
use crewdeck_storage::{
    InvitationCode, InvitationId, Partner, PartnerId, StoreError, Task, TaskId, TeamMember,
    TenantId, UserId, WorkspaceLink,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

pub(crate) fn backend<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Map a write error, surfacing unique-constraint violations.
pub(crate) fn write_error(e: sqlx::Error) -> StoreError {
    let s = e.to_string();
    if s.contains("UNIQUE") {
        StoreError::AlreadyExists
    } else {
        StoreError::Backend(s)
    }
}

pub(crate) fn ts(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn opt_ts(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(ts)
}

pub(crate) fn from_ts(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp: {millis}")))
}

fn from_opt_ts(millis: Option<i64>) -> Result<Option<DateTime<Utc>>, StoreError> {
    millis.map(from_ts).transpose()
}

pub(crate) fn parse<T>(value: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(backend)
}

pub(crate) fn json_list(values: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(values).map_err(backend)
}

fn from_json_list(raw: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(raw).map_err(backend)
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get::<T, _>(column).map_err(backend)
}

fn user(row: &SqliteRow, column: &str) -> Result<UserId, StoreError> {
    Ok(UserId(get::<String>(row, column)?))
}

fn opt_user(row: &SqliteRow, column: &str) -> Result<Option<UserId>, StoreError> {
    Ok(get::<Option<String>>(row, column)?.map(UserId))
}

pub(crate) fn partner_from_row(row: &SqliteRow) -> Result<Partner, StoreError> {
    Ok(Partner {
        id: PartnerId(get(row, "id")?),
        name: get(row, "name")?,
        status: get(row, "status")?,
        plan: get(row, "plan")?,
        created_at: from_ts(get(row, "created_at")?)?,
    })
}

pub(crate) fn member_from_row(row: &SqliteRow) -> Result<TeamMember, StoreError> {
    Ok(TeamMember {
        partner_id: PartnerId(get(row, "partner_id")?),
        user_id: user(row, "user_id")?,
        name: get(row, "name")?,
        phone_number: get(row, "phone_number")?,
        email: get(row, "email")?,
        role: parse(&get::<String>(row, "role")?)?,
        status: parse(&get::<String>(row, "status")?)?,
        skills: from_json_list(&get::<String>(row, "skills")?)?,
        tasks_completed: get::<i64>(row, "tasks_completed")?.max(0) as u32,
        suspended_at: from_opt_ts(get(row, "suspended_at")?)?,
        suspended_by: opt_user(row, "suspended_by")?,
        suspension_reason: get(row, "suspension_reason")?,
        reactivated_at: from_opt_ts(get(row, "reactivated_at")?)?,
        reactivated_by: opt_user(row, "reactivated_by")?,
        created_at: from_ts(get(row, "created_at")?)?,
        updated_at: from_ts(get(row, "updated_at")?)?,
    })
}

pub(crate) fn link_from_row(row: &SqliteRow) -> Result<WorkspaceLink, StoreError> {
    Ok(WorkspaceLink {
        user_id: user(row, "user_id")?,
        partner_id: PartnerId(get(row, "partner_id")?),
        tenant_id: TenantId(get(row, "tenant_id")?),
        role: parse(&get::<String>(row, "role")?)?,
        status: parse(&get::<String>(row, "status")?)?,
        permissions: from_json_list(&get::<String>(row, "permissions")?)?,
        joined_at: from_ts(get(row, "joined_at")?)?,
        suspended_at: from_opt_ts(get(row, "suspended_at")?)?,
        updated_at: from_ts(get(row, "updated_at")?)?,
    })
}

pub(crate) fn invitation_from_row(row: &SqliteRow) -> Result<InvitationCode, StoreError> {
    Ok(InvitationCode {
        id: parse::<InvitationId>(&get::<String>(row, "id")?)?,
        code: get(row, "code")?,
        phone_number: get(row, "phone_number")?,
        name: get(row, "name")?,
        partner_id: PartnerId(get(row, "partner_id")?),
        tenant_id: TenantId(get(row, "tenant_id")?),
        role: parse(&get::<String>(row, "role")?)?,
        invited_by: user(row, "invited_by")?,
        status: parse(&get::<String>(row, "status")?)?,
        created_at: from_ts(get(row, "created_at")?)?,
        expires_at: from_ts(get(row, "expires_at")?)?,
        accepted_by: opt_user(row, "accepted_by")?,
        accepted_at: from_opt_ts(get(row, "accepted_at")?)?,
        resolved_by: opt_user(row, "resolved_by")?,
        resolved_at: from_opt_ts(get(row, "resolved_at")?)?,
    })
}

pub(crate) fn task_from_row(row: &SqliteRow) -> Result<Task, StoreError> {
    Ok(Task {
        id: TaskId(get(row, "id")?),
        partner_id: PartnerId(get(row, "partner_id")?),
        title: get(row, "title")?,
        assignee: opt_user(row, "assignee")?,
        status: parse(&get::<String>(row, "status")?)?,
        revocation_reason: get(row, "revocation_reason")?,
        revoked_at: from_opt_ts(get(row, "revoked_at")?)?,
        transferred_from: opt_user(row, "transferred_from")?,
        transferred_by: opt_user(row, "transferred_by")?,
        transferred_at: from_opt_ts(get(row, "transferred_at")?)?,
        created_at: from_ts(get(row, "created_at")?)?,
        updated_at: from_ts(get(row, "updated_at")?)?,
    })
}
