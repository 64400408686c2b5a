pub mod adapters;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod utils;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::adapters::PostgresIdentityStore;
use crate::auth::AuthResolver;
use crate::config::{Config, CorsOrigins};
use crate::db::ScopeSettings;
use crate::services::{CompletionService, ProposalService, ReservationService};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub auth: AuthResolver,
    pub proposals: ProposalService,
    pub reservations: ReservationService,
    pub completions: CompletionService,
    pub cors_origins: Arc<CorsOrigins>,
}

impl AppState {
    pub fn new(pool: sqlx::PgPool, config: &Config) -> Self {
        let scope = ScopeSettings::from_config(config);
        let identity = Arc::new(PostgresIdentityStore::new(pool.clone()));

        Self {
            auth: AuthResolver::new(&config.jwt_secret, identity),
            proposals: ProposalService::new(pool.clone(), scope.clone(), config.list_limit),
            reservations: ReservationService::new(pool.clone(), scope.clone()),
            completions: CompletionService::new(pool.clone(), scope),
            cors_origins: Arc::new(config.cors_origins.clone()),
            db: pool,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(state.cors_origins.clone());

    Router::new()
        .route("/health", get(handlers::health))
        .route("/openapi.json", get(handlers::openapi))
        .route("/exchange-requests", post(handlers::requests::propose))
        .route("/exchange-requests/mine", get(handlers::requests::list_mine))
        .route("/exchange-requests/unseen-count", get(handlers::requests::unseen_count))
        .route("/exchange-requests/mark-seen", post(handlers::requests::mark_seen))
        .route("/exchange-requests/:id", get(handlers::requests::get_request))
        .route("/exchange-requests/:id/accept", post(handlers::requests::accept))
        .route("/exchange-requests/:id/decline", post(handlers::requests::decline))
        .route("/exchange-requests/:id/cancel", post(handlers::requests::cancel))
        .route("/exchange-requests/:id/counter", post(handlers::requests::counter))
        .route("/exchanges/:id", get(handlers::exchanges::get_exchange))
        .route("/exchanges/:id/complete", post(handlers::exchanges::complete))
        .route("/exchanges/:id/cancel", post(handlers::exchanges::cancel))
        .layer(axum_middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: Arc<CorsOrigins>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().map(|o| origins.allows(o)).unwrap_or(false)
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400))
}
