use crewdeck_identity::{IdentityClaims, IdentityError, IdentityProvider, VersionedClaims};
use crewdeck_storage::UserId;

use crate::SqliteStore;

fn backend<E: std::fmt::Display>(e: E) -> IdentityError {
    IdentityError::Backend(e.to_string())
}

#[async_trait::async_trait]
impl IdentityProvider for SqliteStore {
    async fn get_claims(&self, user_id: &UserId) -> Result<VersionedClaims, IdentityError> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT claims, version FROM identity_claims WHERE user_id=?",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            None => Ok(VersionedClaims::default()),
            Some((raw, version)) => Ok(VersionedClaims {
                claims: serde_json::from_str(&raw).map_err(backend)?,
                version: version.max(0) as u64,
            }),
        }
    }

    async fn set_claims(
        &self,
        user_id: &UserId,
        claims: IdentityClaims,
        expected_version: Option<u64>,
    ) -> Result<u64, IdentityError> {
        let raw = serde_json::to_string(&claims).map_err(backend)?;
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let current: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM identity_claims WHERE user_id=?")
                .bind(user_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;
        let current = current.map(|(v,)| v.max(0) as u64).unwrap_or(0);

        if let Some(expected) = expected_version {
            if expected != current {
                return Err(IdentityError::Conflict {
                    expected,
                    actual: current,
                });
            }
        }

        let next = current + 1;
        sqlx::query(
            "INSERT INTO identity_claims(user_id, claims, version) VALUES(?,?,?)
             ON CONFLICT(user_id) DO UPDATE SET claims=excluded.claims, version=excluded.version",
        )
        .bind(user_id.as_str())
        .bind(raw)
        .bind(next as i64)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(next)
    }
}
