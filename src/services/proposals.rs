use serde::Deserialize;
use sqlx::types::BigDecimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::str::FromStr;

use crate::auth::AuthContext;
use crate::db::models::{ExchangeRequest, ListingState, NewExchangeRequest, RequestStatus};
use crate::db::queries::{self, LockMode};
use crate::db::{begin_scoped, ScopeSettings};
use crate::error::AppError;
use crate::validation::{
    normalize_currency, normalize_message, validate_cash_adjustment, validate_enum, validate_id,
    ValidationError,
};

/// Which side of a request the caller must be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    /// Current owner of `from_listing_id`.
    Proposer,
    /// Current owner of `to_listing_id`.
    Recipient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListRole {
    Sent,
    Received,
}

impl FromStr for ListRole {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim().to_ascii_lowercase();
        validate_enum("role", &value, &["sent", "received"])?;
        Ok(if value == "sent" { ListRole::Sent } else { ListRole::Received })
    }
}

#[derive(Debug, Clone)]
pub struct ProposeInput {
    pub from_listing_id: i64,
    pub to_listing_id: i64,
    pub cash_adjustment: Option<BigDecimal>,
    pub currency: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CounterInput {
    pub cash_adjustment: Option<BigDecimal>,
    pub message: Option<String>,
}

/// Owns the exchange request lifecycle: propose, decline, cancel, counter.
#[derive(Clone)]
pub struct ProposalService {
    pool: PgPool,
    scope: ScopeSettings,
    list_limit: i64,
}

impl ProposalService {
    pub fn new(pool: PgPool, scope: ScopeSettings, list_limit: i64) -> Self {
        Self {
            pool,
            scope,
            list_limit,
        }
    }

    pub async fn propose(
        &self,
        auth: &AuthContext,
        input: ProposeInput,
    ) -> Result<ExchangeRequest, AppError> {
        let user_id = auth.require_user()?;
        validate_id("fromListingId", input.from_listing_id)?;
        validate_id("toListingId", input.to_listing_id)?;
        if input.from_listing_id == input.to_listing_id {
            return Err(AppError::InvalidArgument(
                "fromListingId and toListingId must differ".to_string(),
            ));
        }
        let cash_adjustment = input.cash_adjustment.unwrap_or_else(|| BigDecimal::from(0));
        validate_cash_adjustment(&cash_adjustment)?;
        let currency = normalize_currency(input.currency.as_deref())?;
        let message = normalize_message(input.message.as_deref())?;

        let mut tx = begin_scoped(&self.pool, auth, &self.scope).await?;

        let (from, to) =
            lock_available_pair(&mut tx, user_id, input.from_listing_id, input.to_listing_id).await?;

        let request = queries::insert_request(
            &mut tx,
            &NewExchangeRequest {
                from_listing_id: from.id,
                to_listing_id: to.id,
                from_user_id: from.owner_id,
                to_user_id: to.owner_id,
                message,
                currency,
                cash_adjustment,
                parent_request_id: None,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = request.id,
            from_listing_id = request.from_listing_id,
            to_listing_id = request.to_listing_id,
            user_id,
            "exchange request proposed"
        );

        Ok(request)
    }

    pub async fn decline(&self, auth: &AuthContext, request_id: i64) -> Result<(), AppError> {
        self.resolve(auth, request_id, Party::Recipient, RequestStatus::Rejected)
            .await
    }

    pub async fn cancel(&self, auth: &AuthContext, request_id: i64) -> Result<(), AppError> {
        self.resolve(auth, request_id, Party::Proposer, RequestStatus::Cancelled)
            .await
    }

    async fn resolve(
        &self,
        auth: &AuthContext,
        request_id: i64,
        party: Party,
        outcome: RequestStatus,
    ) -> Result<(), AppError> {
        let user_id = auth.require_user()?;
        validate_id("id", request_id)?;

        let mut tx = begin_scoped(&self.pool, auth, &self.scope).await?;
        lock_pending_for(&mut tx, auth, request_id, party).await?;
        queries::set_request_status(&mut tx, request_id, outcome).await?;
        tx.commit().await?;

        tracing::info!(request_id, user_id, status = ?outcome, "exchange request resolved");
        Ok(())
    }

    /// Rejects the original and opens the reversed, linked proposal in one transaction.
    pub async fn counter(
        &self,
        auth: &AuthContext,
        request_id: i64,
        input: CounterInput,
    ) -> Result<ExchangeRequest, AppError> {
        let user_id = auth.require_user()?;
        validate_id("id", request_id)?;
        let cash_adjustment = input.cash_adjustment.unwrap_or_else(|| BigDecimal::from(0));
        validate_cash_adjustment(&cash_adjustment)?;
        let message = normalize_message(input.message.as_deref())?;

        let mut tx = begin_scoped(&self.pool, auth, &self.scope).await?;

        let original = lock_pending_for(&mut tx, auth, request_id, Party::Recipient).await?;
        queries::set_request_status(&mut tx, original.id, RequestStatus::Rejected).await?;

        let (from, to) =
            lock_available_pair(&mut tx, user_id, original.to_listing_id, original.from_listing_id)
                .await?;

        let counter = queries::insert_request(
            &mut tx,
            &NewExchangeRequest {
                from_listing_id: from.id,
                to_listing_id: to.id,
                from_user_id: from.owner_id,
                to_user_id: to.owner_id,
                message,
                currency: original.currency.clone(),
                cash_adjustment,
                parent_request_id: Some(original.id),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = counter.id,
            parent_request_id = original.id,
            user_id,
            "exchange request countered"
        );

        Ok(counter)
    }

    /// Newest first. Listing `Received` marks the returned rows seen; the rows
    /// themselves carry the flag as it was before this call.
    pub async fn list_mine(
        &self,
        auth: &AuthContext,
        role: ListRole,
    ) -> Result<Vec<ExchangeRequest>, AppError> {
        let user_id = auth.require_user()?;
        let mut tx = begin_scoped(&self.pool, auth, &self.scope).await?;

        let rows = match role {
            ListRole::Sent => queries::list_sent_requests(&mut tx, user_id, self.list_limit).await?,
            ListRole::Received => {
                let rows =
                    queries::list_received_requests(&mut tx, user_id, self.list_limit).await?;
                let unseen: Vec<i64> = rows.iter().filter(|r| !r.is_seen).map(|r| r.id).collect();
                if !unseen.is_empty() {
                    let marked = queries::mark_requests_seen(&mut tx, &unseen).await?;
                    tracing::debug!(user_id, marked, "received requests marked seen");
                }
                rows
            }
        };

        tx.commit().await?;
        Ok(rows)
    }

    pub async fn get(&self, auth: &AuthContext, request_id: i64) -> Result<ExchangeRequest, AppError> {
        let user_id = auth.require_user()?;
        validate_id("id", request_id)?;

        let mut tx = begin_scoped(&self.pool, auth, &self.scope).await?;
        let request = queries::get_request(&mut tx, request_id)
            .await?
            .filter(|r| auth.is_admin() || r.involves(user_id))
            .ok_or_else(|| AppError::NotFound(format!("exchange request {}", request_id)))?;
        tx.commit().await?;

        Ok(request)
    }

    pub async fn unseen_count(&self, auth: &AuthContext) -> Result<i64, AppError> {
        let user_id = auth.require_user()?;
        let mut tx = begin_scoped(&self.pool, auth, &self.scope).await?;
        let count = queries::count_unseen_received(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(count)
    }

    pub async fn mark_seen(&self, auth: &AuthContext) -> Result<u64, AppError> {
        let user_id = auth.require_user()?;
        let mut tx = begin_scoped(&self.pool, auth, &self.scope).await?;
        let updated = queries::mark_pending_received_seen(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(updated)
    }
}

/// Locks the request row, then checks visibility, party and status in that
/// order: `NotFound`, `Forbidden`, `Conflict`.
pub(crate) async fn lock_pending_for(
    tx: &mut Transaction<'_, Postgres>,
    auth: &AuthContext,
    request_id: i64,
    party: Party,
) -> Result<ExchangeRequest, AppError> {
    let user_id = auth.require_user()?;

    let request = queries::lock_request(tx, request_id)
        .await?
        .filter(|r| auth.is_admin() || r.involves(user_id))
        .ok_or_else(|| AppError::NotFound(format!("exchange request {}", request_id)))?;

    let listing_id = match party {
        Party::Proposer => request.from_listing_id,
        Party::Recipient => request.to_listing_id,
    };
    let owner = queries::get_listing_owner(tx, listing_id).await?;
    if owner != Some(user_id) {
        return Err(AppError::Forbidden(format!(
            "user {} is not the {:?} of request {}",
            user_id, party, request_id
        )));
    }

    if request.status.is_terminal() {
        return Err(AppError::already_resolved());
    }

    Ok(request)
}

/// Share-locks both listings and checks ownership, availability and that no
/// pending request already covers the ordered pair.
async fn lock_available_pair(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    from_listing_id: i64,
    to_listing_id: i64,
) -> Result<(ListingState, ListingState), AppError> {
    let (from, to) =
        queries::lock_listing_pair(tx, from_listing_id, to_listing_id, LockMode::Share).await?;
    let from = from.ok_or_else(|| AppError::NotFound(format!("listing {}", from_listing_id)))?;
    let to = to.ok_or_else(|| AppError::NotFound(format!("listing {}", to_listing_id)))?;

    if from.owner_id != user_id {
        return Err(AppError::Forbidden(format!(
            "user {} does not own listing {}",
            user_id, from.id
        )));
    }
    if to.owner_id == user_id {
        return Err(AppError::InvalidArgument(
            "cannot propose a swap between your own listings".to_string(),
        ));
    }

    for listing in [&from, &to] {
        if !listing.is_available() {
            tracing::info!(listing_id = listing.id, "proposal refused, listing unavailable");
            return Err(AppError::listing_unavailable(listing.id));
        }
    }

    if let Some(existing) = queries::find_pending_between(tx, from.id, to.id).await? {
        return Err(AppError::Conflict(format!(
            "request {} is already pending for this listing pair",
            existing
        )));
    }

    Ok((from, to))
}
