use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::handlers::extract::ApiPath;
use crate::handlers::requests::OkResponse;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/exchanges/{id}",
    params(("id" = i64, Path, description = "Exchange id")),
    responses(
        (status = 200, description = "Exchange", body = crate::db::models::Exchange),
        (status = 404, description = "Not allowed or not found")
    ),
    tag = "Exchanges"
)]
pub async fn get_exchange(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exchange = state.completions.get(&auth, id).await?;
    Ok(Json(exchange))
}

#[utoipa::path(
    post,
    path = "/exchanges/{id}/complete",
    params(("id" = i64, Path, description = "Exchange id")),
    responses(
        (status = 200, description = "Exchange completed, listings retired", body = OkResponse),
        (status = 409, description = "Exchange already finished")
    ),
    tag = "Exchanges"
)]
pub async fn complete(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.completions.complete(&auth, id).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[utoipa::path(
    post,
    path = "/exchanges/{id}/cancel",
    params(("id" = i64, Path, description = "Exchange id")),
    responses(
        (status = 200, description = "Exchange cancelled, listings released", body = OkResponse),
        (status = 409, description = "Exchange already finished")
    ),
    tag = "Exchanges"
)]
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.completions.cancel(&auth, id).await?;
    Ok(Json(OkResponse { ok: true }))
}
