use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::AppState;

/// Resolves the acting principal once per request. Never rejects a missing
/// or bad credential; only identity store failures reject.
#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        state.auth.resolve(authorization).await
    }
}
