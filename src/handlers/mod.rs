pub mod auth;
pub mod exchanges;
pub mod extract;
pub mod requests;

use crate::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DbPoolStats {
    pub active_connections: u32,
    pub idle_connections: u32,
    pub max_connections: u32,
    pub usage_percent: f32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub db: String,
    pub db_pool: DbPoolStats,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthStatus),
        (status = 503, description = "Service is unhealthy", body = HealthStatus)
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let connected = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    let pool = &state.db;
    let active_connections = pool.size();
    let max_connections = pool.options().get_max_connections();
    let usage_percent = (active_connections as f32 / max_connections as f32) * 100.0;

    let health_response = HealthStatus {
        status: if connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db: if connected { "connected" } else { "disconnected" }.to_string(),
        db_pool: DbPoolStats {
            active_connections,
            idle_connections: pool.num_idle() as u32,
            max_connections,
            usage_percent,
        },
    };

    let status_code = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        requests::propose,
        requests::accept,
        requests::decline,
        requests::cancel,
        requests::counter,
        requests::list_mine,
        requests::unseen_count,
        requests::mark_seen,
        requests::get_request,
        exchanges::get_exchange,
        exchanges::complete,
        exchanges::cancel,
    ),
    components(schemas(
        HealthStatus,
        DbPoolStats,
        crate::db::models::ExchangeRequest,
        crate::db::models::Exchange,
        crate::db::models::RequestStatus,
        crate::db::models::ExchangeStatus,
        requests::ProposePayload,
        requests::CounterPayload,
        requests::OkResponse,
        requests::AcceptResponse,
        requests::CounterResponse,
        requests::RequestList,
        requests::UnseenCount,
        requests::MarkSeenResponse,
    )),
    tags(
        (name = "Exchange requests", description = "Swap proposals and their negotiation"),
        (name = "Exchanges", description = "Binding swaps between two reserved listings")
    )
)]
pub struct ApiDoc;

pub async fn openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
