use crewdeck_audit::{
    AuditAction, AuditEvent, AuditLog, AuditLogError, AuditLogFilter, AuditLogId, AuditResult,
};
use crewdeck_storage::{PartnerId, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::rows::{from_ts, ts};
use crate::SqliteStore;

const AUDIT_COLUMNS: &str = "id,timestamp,performed_by,target_user_id,partner_id,action,
    resource_type,resource_id,result,reason,details";

fn db<E: std::fmt::Display>(e: E) -> AuditLogError {
    AuditLogError::Database(e.to_string())
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &AuditLogFilter) {
    query.push(" WHERE 1=1");
    if let Some(partner_id) = &filter.partner_id {
        query.push(" AND partner_id = ").push_bind(partner_id.0.clone());
    }
    if let Some(user_id) = &filter.performed_by {
        query.push(" AND performed_by = ").push_bind(user_id.0.clone());
    }
    if let Some(user_id) = &filter.target_user_id {
        query.push(" AND target_user_id = ").push_bind(user_id.0.clone());
    }
    if let Some(action) = filter.action {
        query.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(result) = filter.result {
        query.push(" AND result = ").push_bind(result.to_string());
    }
    if let Some(from) = filter.from {
        query.push(" AND timestamp >= ").push_bind(ts(from));
    }
    if let Some(to) = filter.to {
        query.push(" AND timestamp <= ").push_bind(ts(to));
    }
}

fn event_from_row(row: &SqliteRow) -> Result<AuditEvent, AuditLogError> {
    let id: String = row.try_get("id").map_err(db)?;
    let action: String = row.try_get("action").map_err(db)?;
    let result: String = row.try_get("result").map_err(db)?;
    let details: Option<String> = row.try_get("details").map_err(db)?;
    Ok(AuditEvent {
        id: id.parse::<AuditLogId>().map_err(db)?,
        timestamp: from_ts(row.try_get("timestamp").map_err(db)?).map_err(db)?,
        performed_by: UserId(row.try_get("performed_by").map_err(db)?),
        target_user_id: row
            .try_get::<Option<String>, _>("target_user_id")
            .map_err(db)?
            .map(UserId),
        partner_id: PartnerId(row.try_get("partner_id").map_err(db)?),
        action: action.parse::<AuditAction>().map_err(db)?,
        resource_type: row.try_get("resource_type").map_err(db)?,
        resource_id: row.try_get("resource_id").map_err(db)?,
        result: result.parse::<AuditResult>().map_err(db)?,
        reason: row.try_get("reason").map_err(db)?,
        details: details
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(db)?,
    })
}

#[async_trait::async_trait]
impl AuditLog for SqliteStore {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditLogError> {
        let details = event
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(db)?;
        sqlx::query(
            "INSERT INTO audit_logs(
               id,timestamp,performed_by,target_user_id,partner_id,action,
               resource_type,resource_id,result,reason,details)
             VALUES(?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(event.id.to_string())
        .bind(ts(event.timestamp))
        .bind(event.performed_by.as_str())
        .bind(event.target_user_id.as_ref().map(|u| u.as_str()))
        .bind(event.partner_id.as_str())
        .bind(event.action.as_str())
        .bind(&event.resource_type)
        .bind(&event.resource_id)
        .bind(event.result.to_string())
        .bind(event.reason.as_deref())
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn query(&self, filter: AuditLogFilter) -> Result<Vec<AuditEvent>, AuditLogError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {AUDIT_COLUMNS} FROM audit_logs"));
        push_filters(&mut query, &filter);
        // v7 ids break ties between events in the same millisecond
        query.push(" ORDER BY timestamp DESC, id DESC");
        query
            .push(" LIMIT ")
            .push_bind(filter.limit.map(i64::from).unwrap_or(-1));
        query
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset.unwrap_or(0)));

        let rows = query.build().fetch_all(&self.pool).await.map_err(db)?;
        rows.iter().map(event_from_row).collect()
    }
}
