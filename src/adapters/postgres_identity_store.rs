//! Postgres implementation of IdentityStore.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::ports::{IdentityStore, RepositoryResult};

/// Reads the privileged-account flag from the `users` table.
#[derive(Clone)]
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn is_admin(&self, user_id: i64) -> RepositoryResult<Option<bool>> {
        let flag = sqlx::query_scalar::<_, bool>("SELECT is_admin FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(flag)
    }
}
