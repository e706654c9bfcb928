//! Postgres-backed role store.
//!
//! Expects the role rows table:
//!
//! ```sql
//! CREATE TYPE app_role AS ENUM ('admin', 'moderator');
//! CREATE TABLE user_roles (
//!     id      BIGSERIAL PRIMARY KEY,
//!     user_id UUID      NOT NULL,
//!     role    app_role  NOT NULL,
//!     UNIQUE (user_id, role)
//! );
//! ```

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use portal_auth::{Role, RoleSet, RoleStore, RoleStoreError};
use portal_core::UserId;

/// Reads role rows with one query per lookup. No caching: role changes take
/// effect on the next request.
#[derive(Debug, Clone)]
pub struct PostgresRoleStore {
    pool: PgPool,
}

impl PostgresRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, RoleStoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| RoleStoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RoleStore for PostgresRoleStore {
    async fn get_roles(&self, user_id: UserId) -> Result<RoleSet, RoleStoreError> {
        let rows = sqlx::query("SELECT role::text AS role FROM user_roles WHERE user_id = $1")
            .bind(*user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RoleStoreError::Unavailable(e.to_string()))?;
        tracing::trace!(user_id = %user_id, rows = rows.len(), "fetched role rows");

        // An unreadable row fails the whole lookup rather than being skipped.
        rows.iter()
            .map(|row| {
                let name: String = row
                    .try_get("role")
                    .map_err(|e| RoleStoreError::Decode(e.to_string()))?;
                name.parse::<Role>()
                    .map_err(|e| RoleStoreError::Decode(e.to_string()))
            })
            .collect()
    }
}
