//! SQLite backend for crewdeck.
//!
//! One `SqliteStore` serves three roles: the membership [`Store`], the
//! [`AuditLog`](crewdeck_audit::AuditLog), and a local
//! [`IdentityProvider`](crewdeck_identity::IdentityProvider) for deployments
//! without an external identity service.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;

use crewdeck_storage::{
    InvitationCode, InvitationId, InvitationStatus, MembershipStatus, Partner, PartnerId, Store,
    StoreError, Task, TaskId, TaskStatus, TeamMember, UserId, WorkspaceLink, WriteBatch, WriteOp,
};

mod audit;
mod identity;
mod rows;

use rows::{backend, json_list, opt_ts, ts, write_error};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `~/.crewdeck/crewdeck.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".crewdeck");
        std::fs::create_dir_all(&dir).map_err(backend)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(backend)?;
        }
        let path = dir.join("crewdeck.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(backend)?;

        MIGRATOR.run(&pool).await.map_err(backend)?;

        Ok(Self { pool })
    }

    async fn apply(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        op: &WriteOp,
    ) -> Result<(), StoreError> {
        match op {
            WriteOp::PutPartner(p) => {
                sqlx::query(
                    "INSERT INTO partners(id,name,status,plan,created_at) VALUES(?,?,?,?,?)
                     ON CONFLICT(id) DO UPDATE SET
                       name=excluded.name, status=excluded.status, plan=excluded.plan",
                )
                .bind(p.id.as_str())
                .bind(&p.name)
                .bind(&p.status)
                .bind(&p.plan)
                .bind(ts(p.created_at))
                .execute(&mut **tx)
                .await
                .map_err(write_error)?;
            }
            WriteOp::PutTeamMember(m) => {
                sqlx::query(
                    "INSERT INTO team_members(
                       partner_id,user_id,name,phone_number,email,role,status,skills,
                       tasks_completed,suspended_at,suspended_by,suspension_reason,
                       reactivated_at,reactivated_by,created_at,updated_at)
                     VALUES(?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
                     ON CONFLICT(partner_id,user_id) DO UPDATE SET
                       name=excluded.name, phone_number=excluded.phone_number,
                       email=excluded.email, role=excluded.role, status=excluded.status,
                       skills=excluded.skills, tasks_completed=excluded.tasks_completed,
                       suspended_at=excluded.suspended_at, suspended_by=excluded.suspended_by,
                       suspension_reason=excluded.suspension_reason,
                       reactivated_at=excluded.reactivated_at,
                       reactivated_by=excluded.reactivated_by,
                       updated_at=excluded.updated_at",
                )
                .bind(m.partner_id.as_str())
                .bind(m.user_id.as_str())
                .bind(&m.name)
                .bind(m.phone_number.as_deref())
                .bind(m.email.as_deref())
                .bind(m.role.as_str())
                .bind(m.status.as_str())
                .bind(json_list(&m.skills)?)
                .bind(m.tasks_completed as i64)
                .bind(opt_ts(m.suspended_at))
                .bind(m.suspended_by.as_ref().map(|u| u.as_str()))
                .bind(m.suspension_reason.as_deref())
                .bind(opt_ts(m.reactivated_at))
                .bind(m.reactivated_by.as_ref().map(|u| u.as_str()))
                .bind(ts(m.created_at))
                .bind(ts(m.updated_at))
                .execute(&mut **tx)
                .await
                .map_err(write_error)?;
            }
            WriteOp::PutWorkspaceLink(l) => {
                sqlx::query(
                    "INSERT INTO workspace_links(
                       user_id,partner_id,tenant_id,role,status,permissions,
                       joined_at,suspended_at,updated_at)
                     VALUES(?,?,?,?,?,?,?,?,?)
                     ON CONFLICT(user_id,partner_id) DO UPDATE SET
                       tenant_id=excluded.tenant_id, role=excluded.role,
                       status=excluded.status, permissions=excluded.permissions,
                       suspended_at=excluded.suspended_at, updated_at=excluded.updated_at",
                )
                .bind(l.user_id.as_str())
                .bind(l.partner_id.as_str())
                .bind(l.tenant_id.as_str())
                .bind(l.role.as_str())
                .bind(l.status.as_str())
                .bind(json_list(&l.permissions)?)
                .bind(ts(l.joined_at))
                .bind(opt_ts(l.suspended_at))
                .bind(ts(l.updated_at))
                .execute(&mut **tx)
                .await
                .map_err(write_error)?;
            }
            WriteOp::PutInvitation(i) => {
                sqlx::query(
                    "INSERT INTO invitation_codes(
                       id,code,phone_number,name,partner_id,tenant_id,role,invited_by,status,
                       created_at,expires_at,accepted_by,accepted_at,resolved_by,resolved_at)
                     VALUES(?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
                     ON CONFLICT(id) DO UPDATE SET
                       status=excluded.status, expires_at=excluded.expires_at,
                       accepted_by=excluded.accepted_by, accepted_at=excluded.accepted_at,
                       resolved_by=excluded.resolved_by, resolved_at=excluded.resolved_at",
                )
                .bind(i.id.to_string())
                .bind(&i.code)
                .bind(&i.phone_number)
                .bind(&i.name)
                .bind(i.partner_id.as_str())
                .bind(i.tenant_id.as_str())
                .bind(i.role.as_str())
                .bind(i.invited_by.as_str())
                .bind(i.status.as_str())
                .bind(ts(i.created_at))
                .bind(ts(i.expires_at))
                .bind(i.accepted_by.as_ref().map(|u| u.as_str()))
                .bind(opt_ts(i.accepted_at))
                .bind(i.resolved_by.as_ref().map(|u| u.as_str()))
                .bind(opt_ts(i.resolved_at))
                .execute(&mut **tx)
                .await
                .map_err(write_error)?;
            }
            WriteOp::PutTask(t) => {
                sqlx::query(
                    "INSERT INTO tasks(
                       id,partner_id,title,assignee,status,revocation_reason,revoked_at,
                       transferred_from,transferred_by,transferred_at,created_at,updated_at)
                     VALUES(?,?,?,?,?,?,?,?,?,?,?,?)
                     ON CONFLICT(id) DO UPDATE SET
                       title=excluded.title, assignee=excluded.assignee, status=excluded.status,
                       revocation_reason=excluded.revocation_reason,
                       revoked_at=excluded.revoked_at,
                       transferred_from=excluded.transferred_from,
                       transferred_by=excluded.transferred_by,
                       transferred_at=excluded.transferred_at,
                       updated_at=excluded.updated_at",
                )
                .bind(t.id.as_str())
                .bind(t.partner_id.as_str())
                .bind(&t.title)
                .bind(t.assignee.as_ref().map(|u| u.as_str()))
                .bind(t.status.as_str())
                .bind(t.revocation_reason.as_deref())
                .bind(opt_ts(t.revoked_at))
                .bind(t.transferred_from.as_ref().map(|u| u.as_str()))
                .bind(t.transferred_by.as_ref().map(|u| u.as_str()))
                .bind(opt_ts(t.transferred_at))
                .bind(ts(t.created_at))
                .bind(ts(t.updated_at))
                .execute(&mut **tx)
                .await
                .map_err(write_error)?;
            }
        }
        Ok(())
    }
}

const MEMBER_COLUMNS: &str = "partner_id,user_id,name,phone_number,email,role,status,skills,
    tasks_completed,suspended_at,suspended_by,suspension_reason,reactivated_at,reactivated_by,
    created_at,updated_at";

const LINK_COLUMNS: &str =
    "user_id,partner_id,tenant_id,role,status,permissions,joined_at,suspended_at,updated_at";

const INVITATION_COLUMNS: &str = "id,code,phone_number,name,partner_id,tenant_id,role,invited_by,
    status,created_at,expires_at,accepted_by,accepted_at,resolved_by,resolved_at";

const TASK_COLUMNS: &str = "id,partner_id,title,assignee,status,revocation_reason,revoked_at,
    transferred_from,transferred_by,transferred_at,created_at,updated_at";

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────── Writes ─────────────────────────────────

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for op in batch.ops() {
            // Dropping `tx` on error rolls the whole batch back.
            Self::apply(&mut tx, op).await?;
        }
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    // ───────────────────────────── Partners ───────────────────────────────

    async fn get_partner(&self, partner_id: &PartnerId) -> Result<Partner, StoreError> {
        let row = sqlx::query("SELECT id,name,status,plan,created_at FROM partners WHERE id=?")
            .bind(partner_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => rows::partner_from_row(&row),
        }
    }

    // ──────────────────────────── Team Members ────────────────────────────

    async fn get_team_member(
        &self,
        partner_id: &PartnerId,
        user_id: &UserId,
    ) -> Result<TeamMember, StoreError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE partner_id=? AND user_id=?");
        let row = sqlx::query(&sql)
            .bind(partner_id.as_str())
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => rows::member_from_row(&row),
        }
    }

    async fn list_memberships_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<TeamMember>, StoreError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE user_id=? ORDER BY partner_id");
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(rows::member_from_row).collect()
    }

    async fn list_team_members(
        &self,
        partner_id: &PartnerId,
        status: Option<MembershipStatus>,
    ) -> Result<Vec<TeamMember>, StoreError> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members
             WHERE partner_id=? AND (? IS NULL OR status=?)
             ORDER BY name, user_id"
        );
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query(&sql)
            .bind(partner_id.as_str())
            .bind(status)
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(rows::member_from_row).collect()
    }

    // ─────────────────────────── Workspace Links ──────────────────────────

    async fn get_workspace_link(
        &self,
        user_id: &UserId,
        partner_id: &PartnerId,
    ) -> Result<WorkspaceLink, StoreError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM workspace_links WHERE user_id=? AND partner_id=?"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(partner_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => rows::link_from_row(&row),
        }
    }

    async fn list_workspace_links(
        &self,
        user_id: &UserId,
        status: Option<MembershipStatus>,
    ) -> Result<Vec<WorkspaceLink>, StoreError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM workspace_links
             WHERE user_id=? AND (? IS NULL OR status=?)
             ORDER BY partner_id"
        );
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(status)
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(rows::link_from_row).collect()
    }

    // ───────────────────────────── Invitations ────────────────────────────

    async fn get_invitation(&self, id: &InvitationId) -> Result<InvitationCode, StoreError> {
        let sql = format!("SELECT {INVITATION_COLUMNS} FROM invitation_codes WHERE id=?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => rows::invitation_from_row(&row),
        }
    }

    async fn find_pending_invitation_by_code(
        &self,
        code: &str,
    ) -> Result<Option<InvitationCode>, StoreError> {
        let sql = format!(
            "SELECT {INVITATION_COLUMNS} FROM invitation_codes WHERE code=? AND status='pending'"
        );
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(rows::invitation_from_row).transpose()
    }

    async fn list_pending_invitations_for_phone(
        &self,
        phone_number: &str,
        partner_id: &PartnerId,
    ) -> Result<Vec<InvitationCode>, StoreError> {
        let sql = format!(
            "SELECT {INVITATION_COLUMNS} FROM invitation_codes
             WHERE phone_number=? AND partner_id=? AND status='pending'
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(phone_number)
            .bind(partner_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(rows::invitation_from_row).collect()
    }

    async fn list_invitations(
        &self,
        partner_id: &PartnerId,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<InvitationCode>, StoreError> {
        let sql = format!(
            "SELECT {INVITATION_COLUMNS} FROM invitation_codes
             WHERE partner_id=? AND (? IS NULL OR status=?)
             ORDER BY created_at DESC, id DESC"
        );
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query(&sql)
            .bind(partner_id.as_str())
            .bind(status)
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(rows::invitation_from_row).collect()
    }

    // ──────────────────────────────── Tasks ───────────────────────────────

    async fn get_task(&self, task_id: &TaskId) -> Result<Task, StoreError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id=?");
        let row = sqlx::query(&sql)
            .bind(task_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => rows::task_from_row(&row),
        }
    }

    async fn list_tasks(
        &self,
        partner_id: &PartnerId,
        assignee: Option<UserId>,
        statuses: Vec<TaskStatus>,
    ) -> Result<Vec<Task>, StoreError> {
        let mut query = sqlx::QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE partner_id = "
        ));
        query.push_bind(partner_id.as_str().to_owned());
        if let Some(assignee) = assignee {
            query.push(" AND assignee = ").push_bind(assignee.0);
        }
        if !statuses.is_empty() {
            query.push(" AND status IN (");
            let mut separated = query.separated(", ");
            for status in &statuses {
                separated.push_bind(status.as_str());
            }
            query.push(")");
        }
        query.push(" ORDER BY created_at, id");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(rows::task_from_row).collect()
    }
}
