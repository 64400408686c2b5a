use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::BigDecimal;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "exchange_request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    /// Accepted, rejected and cancelled admit no further transition.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "exchange_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Active,
    Completed,
    Cancelled,
}

impl ExchangeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExchangeStatus::Active)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct ExchangeRequest {
    pub id: i64,
    pub from_listing_id: i64,
    pub to_listing_id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub message: Option<String>,
    pub currency: String,
    #[schema(value_type = String, example = "500.00")]
    pub cash_adjustment: BigDecimal,
    pub status: RequestStatus,
    pub is_seen: bool,
    pub parent_request_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRequest {
    pub fn involves(&self, user_id: i64) -> bool {
        self.from_user_id == user_id || self.to_user_id == user_id
    }
}

/// Values for a request row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewExchangeRequest {
    pub from_listing_id: i64,
    pub to_listing_id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub message: Option<String>,
    pub currency: String,
    pub cash_adjustment: BigDecimal,
    pub parent_request_id: Option<i64>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Exchange {
    pub id: i64,
    pub listing_a_id: i64,
    pub listing_b_id: i64,
    pub a_user_id: i64,
    pub b_user_id: i64,
    pub currency: String,
    #[schema(value_type = String, example = "300.00")]
    pub cash_adjustment_a_to_b: BigDecimal,
    pub status: ExchangeStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewExchange {
    pub listing_a_id: i64,
    pub listing_b_id: i64,
    pub a_user_id: i64,
    pub b_user_id: i64,
    pub currency: String,
    pub cash_adjustment_a_to_b: BigDecimal,
}

impl Exchange {
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.a_user_id == user_id || self.b_user_id == user_id
    }
}

/// The slice of a listing row the engine reads and writes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ListingState {
    pub id: i64,
    pub owner_id: i64,
    pub is_active: bool,
    pub reserved_exchange_id: Option<i64>,
    pub exchanged_at: Option<DateTime<Utc>>,
}

impl ListingState {
    /// Eligible for new proposals and for acceptance.
    pub fn is_available(&self) -> bool {
        self.is_active && self.reserved_exchange_id.is_none()
    }
}
