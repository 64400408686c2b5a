use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthContext;
use crate::db::models::ExchangeRequest;
use crate::error::AppError;
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::{CounterInput, ListRole, ProposeInput};
use crate::AppState;

const NO_STORE: [(header::HeaderName, &str); 2] = [
    (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
    (header::VARY, "Authorization"),
];

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposePayload {
    pub from_listing_id: i64,
    pub to_listing_id: i64,
    #[schema(value_type = Option<String>, example = "500")]
    pub cash_adjustment: Option<BigDecimal>,
    #[schema(example = "INR")]
    pub currency: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CounterPayload {
    #[schema(value_type = Option<String>, example = "300")]
    pub cash_adjustment: Option<BigDecimal>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MineQuery {
    /// `sent` or `received` (default).
    pub role: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub ok: bool,
    pub exchange_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CounterResponse {
    pub ok: bool,
    pub counter: ExchangeRequest,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestList {
    pub items: Vec<ExchangeRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnseenCount {
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkSeenResponse {
    pub updated: u64,
}

#[utoipa::path(
    post,
    path = "/exchange-requests",
    request_body = ProposePayload,
    responses(
        (status = 200, description = "Proposal created", body = ExchangeRequest),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Caller does not own the offered listing"),
        (status = 409, description = "Listing unavailable or proposal already pending")
    ),
    tag = "Exchange requests"
)]
pub async fn propose(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(payload): ApiJson<ProposePayload>,
) -> Result<impl IntoResponse, AppError> {
    let request = state
        .proposals
        .propose(
            &auth,
            ProposeInput {
                from_listing_id: payload.from_listing_id,
                to_listing_id: payload.to_listing_id,
                cash_adjustment: payload.cash_adjustment,
                currency: payload.currency,
                message: payload.message,
            },
        )
        .await?;

    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/exchange-requests/{id}/accept",
    params(("id" = i64, Path, description = "Exchange request id")),
    responses(
        (status = 200, description = "Exchange created, both listings reserved", body = AcceptResponse),
        (status = 409, description = "Already resolved or listing unavailable")
    ),
    tag = "Exchange requests"
)]
pub async fn accept(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exchange = state.reservations.accept(&auth, id).await?;
    Ok(Json(AcceptResponse {
        ok: true,
        exchange_id: exchange.id,
    }))
}

#[utoipa::path(
    post,
    path = "/exchange-requests/{id}/decline",
    params(("id" = i64, Path, description = "Exchange request id")),
    responses(
        (status = 200, description = "Request rejected", body = OkResponse),
        (status = 409, description = "Already resolved")
    ),
    tag = "Exchange requests"
)]
pub async fn decline(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.proposals.decline(&auth, id).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[utoipa::path(
    post,
    path = "/exchange-requests/{id}/cancel",
    params(("id" = i64, Path, description = "Exchange request id")),
    responses(
        (status = 200, description = "Request cancelled", body = OkResponse),
        (status = 409, description = "Already resolved")
    ),
    tag = "Exchange requests"
)]
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.proposals.cancel(&auth, id).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[utoipa::path(
    post,
    path = "/exchange-requests/{id}/counter",
    params(("id" = i64, Path, description = "Exchange request id")),
    request_body = CounterPayload,
    responses(
        (status = 200, description = "Original rejected, reversed proposal created", body = CounterResponse),
        (status = 409, description = "Already resolved or listing unavailable")
    ),
    tag = "Exchange requests"
)]
pub async fn counter(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CounterPayload>,
) -> Result<impl IntoResponse, AppError> {
    let counter = state
        .proposals
        .counter(
            &auth,
            id,
            CounterInput {
                cash_adjustment: payload.cash_adjustment,
                message: payload.message,
            },
        )
        .await?;

    Ok(Json(CounterResponse { ok: true, counter }))
}

#[utoipa::path(
    get,
    path = "/exchange-requests/mine",
    params(MineQuery),
    responses(
        (status = 200, description = "Requests newest first; received ones are marked seen", body = RequestList),
        (status = 400, description = "Unknown role")
    ),
    tag = "Exchange requests"
)]
pub async fn list_mine(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<MineQuery>,
) -> Result<impl IntoResponse, AppError> {
    let role = match query.role.as_deref() {
        Some(raw) => raw.parse::<ListRole>()?,
        None => ListRole::Received,
    };

    let items = state.proposals.list_mine(&auth, role).await?;
    Ok((NO_STORE, Json(RequestList { items })))
}

#[utoipa::path(
    get,
    path = "/exchange-requests/unseen-count",
    responses((status = 200, description = "Pending received requests not yet seen", body = UnseenCount)),
    tag = "Exchange requests"
)]
pub async fn unseen_count(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let count = state.proposals.unseen_count(&auth).await?;
    Ok((NO_STORE, Json(UnseenCount { count })))
}

#[utoipa::path(
    post,
    path = "/exchange-requests/mark-seen",
    responses((status = 200, description = "Pending received requests marked seen", body = MarkSeenResponse)),
    tag = "Exchange requests"
)]
pub async fn mark_seen(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.proposals.mark_seen(&auth).await?;
    Ok(Json(MarkSeenResponse { updated }))
}

#[utoipa::path(
    get,
    path = "/exchange-requests/{id}",
    params(("id" = i64, Path, description = "Exchange request id")),
    responses(
        (status = 200, description = "Exchange request", body = ExchangeRequest),
        (status = 404, description = "Not allowed or not found")
    ),
    tag = "Exchange requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.proposals.get(&auth, id).await?;
    Ok(Json(request))
}
