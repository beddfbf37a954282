//! HTTP routing: the `/api` tree plus health.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::CacheStats;
use crate::{apartments, availability, bookings, invoices, pricing, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: CacheStats,
}

/// All `/api` routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(pricing::router())
        .merge(availability::router())
        .merge(apartments::router())
        .merge(bookings::router())
        .merge(invoices::router())
}

/// The complete application with tracing and CORS layers applied.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache: state.cache.stats(),
    })
}
