use sqlx::{PgPool, Postgres, Transaction};

use crate::auth::AuthContext;
use crate::db::models::{Exchange, ExchangeStatus};
use crate::db::queries::{self, LockMode};
use crate::db::{begin_scoped, ScopeSettings};
use crate::error::AppError;
use crate::validation::validate_id;

#[derive(Clone)]
pub struct CompletionService {
    pool: PgPool,
    scope: ScopeSettings,
}

impl CompletionService {
    pub fn new(pool: PgPool, scope: ScopeSettings) -> Self {
        Self { pool, scope }
    }

    /// Closes an active exchange and retires both listings as swapped.
    pub async fn complete(&self, auth: &AuthContext, exchange_id: i64) -> Result<Exchange, AppError> {
        self.finish(auth, exchange_id, ExchangeStatus::Completed).await
    }

    /// Closes an active exchange and returns both listings to the market.
    pub async fn cancel(&self, auth: &AuthContext, exchange_id: i64) -> Result<Exchange, AppError> {
        self.finish(auth, exchange_id, ExchangeStatus::Cancelled).await
    }

    pub async fn get(&self, auth: &AuthContext, exchange_id: i64) -> Result<Exchange, AppError> {
        let user_id = auth.require_user()?;
        validate_id("id", exchange_id)?;

        let mut tx = begin_scoped(&self.pool, auth, &self.scope).await?;
        let exchange = queries::get_exchange(&mut tx, exchange_id)
            .await?
            .filter(|e| auth.is_admin() || e.is_participant(user_id))
            .ok_or_else(|| AppError::NotFound(format!("exchange {}", exchange_id)))?;
        tx.commit().await?;

        Ok(exchange)
    }

    async fn finish(
        &self,
        auth: &AuthContext,
        exchange_id: i64,
        outcome: ExchangeStatus,
    ) -> Result<Exchange, AppError> {
        let user_id = auth.require_user()?;
        validate_id("id", exchange_id)?;

        let mut tx = begin_scoped(&self.pool, auth, &self.scope).await?;
        let exchange = lock_active_for(&mut tx, auth, exchange_id).await?;
        let listing_ids = [exchange.listing_a_id, exchange.listing_b_id];

        queries::lock_listing_pair(
            &mut tx,
            exchange.listing_a_id,
            exchange.listing_b_id,
            LockMode::Update,
        )
        .await?;

        let finished = queries::finish_exchange(&mut tx, exchange_id, outcome).await?;

        let touched = match outcome {
            ExchangeStatus::Completed => {
                queries::mark_listings_exchanged(&mut tx, listing_ids, exchange_id).await?
            }
            _ => queries::release_listings(&mut tx, listing_ids, exchange_id).await?,
        };
        if touched != 2 {
            return Err(AppError::Internal(format!(
                "exchange {} held {} of its 2 listings",
                exchange_id, touched
            )));
        }

        tx.commit().await?;

        tracing::info!(exchange_id, user_id, status = ?outcome, "exchange finished");
        Ok(finished)
    }
}

async fn lock_active_for(
    tx: &mut Transaction<'_, Postgres>,
    auth: &AuthContext,
    exchange_id: i64,
) -> Result<Exchange, AppError> {
    let user_id = auth.require_user()?;

    let exchange = queries::lock_exchange(tx, exchange_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("exchange {}", exchange_id)))?;

    if !exchange.is_participant(user_id) {
        return Err(if auth.is_admin() {
            AppError::Forbidden(format!("user {} is not a participant", user_id))
        } else {
            AppError::NotFound(format!("exchange {}", exchange_id))
        });
    }

    if exchange.status.is_terminal() {
        return Err(AppError::already_finished());
    }

    Ok(exchange)
}
