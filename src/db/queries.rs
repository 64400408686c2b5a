use sqlx::{Postgres, Result, Transaction as SqlxTransaction};

use crate::db::models::{
    Exchange, ExchangeRequest, ExchangeStatus, ListingState, NewExchange, NewExchangeRequest,
    RequestStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Blocks concurrent reservation while reading availability.
    Share,
    Update,
}

impl LockMode {
    fn clause(self) -> &'static str {
        match self {
            LockMode::Share => "FOR SHARE",
            LockMode::Update => "FOR UPDATE",
        }
    }
}

/// The single total order in which listing rows are locked.
pub fn lock_order(a: i64, b: i64) -> [i64; 2] {
    if a <= b { [a, b] } else { [b, a] }
}

// --- Listing Queries ---

pub async fn get_listing_owner(
    executor: &mut SqlxTransaction<'_, Postgres>,
    listing_id: i64,
) -> Result<Option<i64>> {
    sqlx::query_scalar::<_, i64>("SELECT owner_id FROM listings WHERE id = $1")
        .bind(listing_id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn lock_listing(
    executor: &mut SqlxTransaction<'_, Postgres>,
    listing_id: i64,
    mode: LockMode,
) -> Result<Option<ListingState>> {
    let sql = format!(
        "SELECT id, owner_id, is_active, reserved_exchange_id, exchanged_at \
         FROM listings WHERE id = $1 {}",
        mode.clause()
    );

    sqlx::query_as::<_, ListingState>(&sql)
        .bind(listing_id)
        .fetch_optional(&mut **executor)
        .await
}

/// Locks both listings in ascending id order and returns them in argument order.
pub async fn lock_listing_pair(
    executor: &mut SqlxTransaction<'_, Postgres>,
    first: i64,
    second: i64,
    mode: LockMode,
) -> Result<(Option<ListingState>, Option<ListingState>)> {
    let [low, high] = lock_order(first, second);
    let low_row = lock_listing(executor, low, mode).await?;
    let high_row = lock_listing(executor, high, mode).await?;

    if first == low {
        Ok((low_row, high_row))
    } else {
        Ok((high_row, low_row))
    }
}

pub async fn reserve_listings(
    executor: &mut SqlxTransaction<'_, Postgres>,
    listing_ids: [i64; 2],
    exchange_id: i64,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE listings SET reserved_exchange_id = $1
        WHERE id = ANY($2) AND is_active AND reserved_exchange_id IS NULL
        "#,
    )
    .bind(exchange_id)
    .bind(&listing_ids[..])
    .execute(&mut **executor)
    .await?;

    Ok(result.rows_affected())
}

/// Terminal swapped state: inactive, stamped, no reservation.
pub async fn mark_listings_exchanged(
    executor: &mut SqlxTransaction<'_, Postgres>,
    listing_ids: [i64; 2],
    exchange_id: i64,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE listings
        SET is_active = FALSE, exchanged_at = NOW(), reserved_exchange_id = NULL
        WHERE id = ANY($1) AND reserved_exchange_id = $2
        "#,
    )
    .bind(&listing_ids[..])
    .bind(exchange_id)
    .execute(&mut **executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn release_listings(
    executor: &mut SqlxTransaction<'_, Postgres>,
    listing_ids: [i64; 2],
    exchange_id: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE listings SET reserved_exchange_id = NULL WHERE id = ANY($1) AND reserved_exchange_id = $2",
    )
    .bind(&listing_ids[..])
    .bind(exchange_id)
    .execute(&mut **executor)
    .await?;

    Ok(result.rows_affected())
}

// --- Exchange Request Queries ---

pub async fn insert_request(
    executor: &mut SqlxTransaction<'_, Postgres>,
    request: &NewExchangeRequest,
) -> Result<ExchangeRequest> {
    sqlx::query_as::<_, ExchangeRequest>(
        r#"
        INSERT INTO exchange_requests (
            from_listing_id, to_listing_id, from_user_id, to_user_id,
            message, currency, cash_adjustment, parent_request_id
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(request.from_listing_id)
    .bind(request.to_listing_id)
    .bind(request.from_user_id)
    .bind(request.to_user_id)
    .bind(&request.message)
    .bind(&request.currency)
    .bind(&request.cash_adjustment)
    .bind(request.parent_request_id)
    .fetch_one(&mut **executor)
    .await
}

pub async fn get_request(
    executor: &mut SqlxTransaction<'_, Postgres>,
    request_id: i64,
) -> Result<Option<ExchangeRequest>> {
    sqlx::query_as::<_, ExchangeRequest>("SELECT * FROM exchange_requests WHERE id = $1")
        .bind(request_id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn lock_request(
    executor: &mut SqlxTransaction<'_, Postgres>,
    request_id: i64,
) -> Result<Option<ExchangeRequest>> {
    sqlx::query_as::<_, ExchangeRequest>("SELECT * FROM exchange_requests WHERE id = $1 FOR UPDATE")
        .bind(request_id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn find_pending_between(
    executor: &mut SqlxTransaction<'_, Postgres>,
    from_listing_id: i64,
    to_listing_id: i64,
) -> Result<Option<i64>> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id FROM exchange_requests
        WHERE from_listing_id = $1 AND to_listing_id = $2 AND status = 'pending'
        "#,
    )
    .bind(from_listing_id)
    .bind(to_listing_id)
    .fetch_optional(&mut **executor)
    .await
}

pub async fn set_request_status(
    executor: &mut SqlxTransaction<'_, Postgres>,
    request_id: i64,
    status: RequestStatus,
) -> Result<ExchangeRequest> {
    sqlx::query_as::<_, ExchangeRequest>(
        "UPDATE exchange_requests SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(request_id)
    .bind(status)
    .fetch_one(&mut **executor)
    .await
}

pub async fn list_sent_requests(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<ExchangeRequest>> {
    sqlx::query_as::<_, ExchangeRequest>(
        "SELECT * FROM exchange_requests WHERE from_user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(&mut **executor)
    .await
}

pub async fn list_received_requests(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<ExchangeRequest>> {
    sqlx::query_as::<_, ExchangeRequest>(
        "SELECT * FROM exchange_requests WHERE to_user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(&mut **executor)
    .await
}

pub async fn mark_requests_seen(
    executor: &mut SqlxTransaction<'_, Postgres>,
    request_ids: &[i64],
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE exchange_requests SET is_seen = TRUE, updated_at = NOW() WHERE id = ANY($1) AND NOT is_seen",
    )
    .bind(request_ids)
    .execute(&mut **executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn mark_pending_received_seen(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: i64,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE exchange_requests SET is_seen = TRUE, updated_at = NOW()
        WHERE to_user_id = $1 AND status = 'pending' AND NOT is_seen
        "#,
    )
    .bind(user_id)
    .execute(&mut **executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn count_unseen_received(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: i64,
) -> Result<i64> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM exchange_requests
        WHERE to_user_id = $1 AND status = 'pending' AND NOT is_seen
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut **executor)
    .await
}

// --- Exchange Queries ---

pub async fn insert_exchange(
    executor: &mut SqlxTransaction<'_, Postgres>,
    exchange: &NewExchange,
) -> Result<Exchange> {
    sqlx::query_as::<_, Exchange>(
        r#"
        INSERT INTO exchanges (
            listing_a_id, listing_b_id, a_user_id, b_user_id,
            currency, cash_adjustment_a_to_b, status
        ) VALUES ($1, $2, $3, $4, $5, $6, 'active')
        RETURNING *
        "#,
    )
    .bind(exchange.listing_a_id)
    .bind(exchange.listing_b_id)
    .bind(exchange.a_user_id)
    .bind(exchange.b_user_id)
    .bind(&exchange.currency)
    .bind(&exchange.cash_adjustment_a_to_b)
    .fetch_one(&mut **executor)
    .await
}

pub async fn get_exchange(
    executor: &mut SqlxTransaction<'_, Postgres>,
    exchange_id: i64,
) -> Result<Option<Exchange>> {
    sqlx::query_as::<_, Exchange>("SELECT * FROM exchanges WHERE id = $1")
        .bind(exchange_id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn lock_exchange(
    executor: &mut SqlxTransaction<'_, Postgres>,
    exchange_id: i64,
) -> Result<Option<Exchange>> {
    sqlx::query_as::<_, Exchange>("SELECT * FROM exchanges WHERE id = $1 FOR UPDATE")
        .bind(exchange_id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn finish_exchange(
    executor: &mut SqlxTransaction<'_, Postgres>,
    exchange_id: i64,
    status: ExchangeStatus,
) -> Result<Exchange> {
    sqlx::query_as::<_, Exchange>(
        r#"
        UPDATE exchanges
        SET status = $2,
            completed_at = CASE WHEN $2 = 'completed'::exchange_status THEN NOW() ELSE NULL END
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(exchange_id)
    .bind(status)
    .fetch_one(&mut **executor)
    .await
}
