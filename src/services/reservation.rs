use sqlx::PgPool;

use crate::auth::AuthContext;
use crate::db::models::{Exchange, NewExchange, RequestStatus};
use crate::db::queries::{self, LockMode};
use crate::db::{begin_scoped, ScopeSettings};
use crate::error::AppError;
use crate::services::proposals::{lock_pending_for, Party};
use crate::validation::validate_id;

/// Turns an accepted request into an exchange holding both listings.
///
/// Mutual exclusion comes entirely from row locks taken inside one
/// transaction: the request row first, then both listing rows in ascending id
/// order. Any failure drops the transaction, so a half-reserved pair is never
/// visible.
#[derive(Clone)]
pub struct ReservationService {
    pool: PgPool,
    scope: ScopeSettings,
}

impl ReservationService {
    pub fn new(pool: PgPool, scope: ScopeSettings) -> Self {
        Self { pool, scope }
    }

    pub async fn accept(&self, auth: &AuthContext, request_id: i64) -> Result<Exchange, AppError> {
        let user_id = auth.require_user()?;
        validate_id("id", request_id)?;

        let mut tx = begin_scoped(&self.pool, auth, &self.scope).await?;

        // A concurrent accept/decline/counter that won the lock leaves a
        // terminal status behind, which surfaces here as "already resolved".
        let request = lock_pending_for(&mut tx, auth, request_id, Party::Recipient).await?;

        let (from, to) = queries::lock_listing_pair(
            &mut tx,
            request.from_listing_id,
            request.to_listing_id,
            LockMode::Update,
        )
        .await?;
        let from = from.ok_or_else(|| AppError::listing_unavailable(request.from_listing_id))?;
        let to = to.ok_or_else(|| AppError::listing_unavailable(request.to_listing_id))?;

        for listing in [&from, &to] {
            if !listing.is_available() {
                tracing::info!(
                    request_id,
                    listing_id = listing.id,
                    reserved_exchange_id = ?listing.reserved_exchange_id,
                    "accept lost the race for a listing"
                );
                return Err(AppError::listing_unavailable(listing.id));
            }
        }
        if from.owner_id == to.owner_id {
            return Err(AppError::Conflict("listing ownership changed".to_string()));
        }

        let exchange = queries::insert_exchange(
            &mut tx,
            &NewExchange {
                listing_a_id: from.id,
                listing_b_id: to.id,
                a_user_id: from.owner_id,
                b_user_id: to.owner_id,
                currency: request.currency.clone(),
                cash_adjustment_a_to_b: request.cash_adjustment.clone(),
            },
        )
        .await?;

        let reserved = queries::reserve_listings(&mut tx, [from.id, to.id], exchange.id).await?;
        if reserved != 2 {
            return Err(AppError::Internal(format!(
                "reserved {} of 2 listings for exchange {}",
                reserved, exchange.id
            )));
        }

        queries::set_request_status(&mut tx, request.id, RequestStatus::Accepted).await?;

        tx.commit().await?;

        tracing::info!(
            request_id,
            exchange_id = exchange.id,
            listing_a_id = exchange.listing_a_id,
            listing_b_id = exchange.listing_b_id,
            user_id,
            "exchange request accepted, listings reserved"
        );

        Ok(exchange)
    }
}
