//! Per-call transaction scope.
//!
//! The acting principal is projected into the transaction with
//! transaction-local settings only (`set_config(.., true)`, `SET LOCAL`), so
//! commit or rollback clears it before the connection returns to the pool.

use sqlx::{PgPool, Postgres, Transaction};

use crate::auth::AuthContext;
use crate::config::Config;

#[derive(Debug, Clone)]
pub struct ScopeSettings {
    pub lock_timeout_ms: u64,
    pub switch_role: bool,
}

impl ScopeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lock_timeout_ms: config.db_lock_timeout_ms,
            switch_role: config.db_switch_role,
        }
    }
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5000,
            switch_role: false,
        }
    }
}

pub async fn begin_scoped(
    pool: &PgPool,
    auth: &AuthContext,
    settings: &ScopeSettings,
) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        SELECT
            set_config('request.jwt.claims.role', $1, true),
            set_config('request.jwt.claims.user_id', $2, true),
            set_config('lock_timeout', $3, true)
        "#,
    )
    .bind(auth.role.as_str())
    .bind(auth.user_id.map(|id| id.to_string()).unwrap_or_default())
    .bind(format!("{}ms", settings.lock_timeout_ms))
    .execute(&mut *tx)
    .await?;

    if settings.switch_role {
        // Role names come from a fixed whitelist; SET ROLE takes no bind parameters.
        let statement = format!("SET LOCAL ROLE {}", auth.role.db_role());
        sqlx::query(&statement).execute(&mut *tx).await?;
    }

    Ok(tx)
}
