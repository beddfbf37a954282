//! Apartment and daily-rate route handlers

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::db::{ApartmentRepository, DailyRateRepository};
use crate::error::{AppError, Result};
use crate::models::{Apartment, DailyRate};
use crate::pricing::services::load_apartment;
use crate::AppState;

use super::requests::{DailyRateRangeQuery, UpsertApartmentRequest, UpsertDailyRateRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/apartments/:id", get(show).put(upsert))
        .route("/apartments/:id/daily-rates", get(list_rates))
        .route("/apartments/:id/daily-rates/:date", put(upsert_rate))
}

async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Apartment>> {
    let apartment = load_apartment(state.store.as_ref(), &state.cache, id).await?;
    Ok(Json(apartment.as_ref().clone()))
}

async fn upsert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpsertApartmentRequest>,
) -> Result<Json<Apartment>> {
    let apartment = req.into_apartment(id, &state.config.default_currency)?;
    state.store.upsert_apartment(&apartment).await?;
    state.cache.invalidate_apartment(id).await;

    tracing::info!(apartment_id = %id, name = %apartment.name, "Apartment saved");
    Ok(Json(apartment))
}

async fn list_rates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(range): Query<DailyRateRangeQuery>,
) -> Result<Json<Vec<DailyRate>>> {
    if range.to <= range.from {
        return Err(AppError::BadRequest("to must be after from".to_string()));
    }
    load_apartment(state.store.as_ref(), &state.cache, id).await?;
    let rates = state.store.list_daily_rates(id, range.from, range.to).await?;
    Ok(Json(rates))
}

async fn upsert_rate(
    State(state): State<AppState>,
    Path((id, date)): Path<(Uuid, NaiveDate)>,
    Json(req): Json<UpsertDailyRateRequest>,
) -> Result<Json<DailyRate>> {
    load_apartment(state.store.as_ref(), &state.cache, id).await?;
    let rate = req.into_daily_rate(id, date)?;
    state.store.upsert_daily_rate(&rate).await?;

    tracing::debug!(apartment_id = %id, %date, blocked = rate.is_blocked, "Daily rate saved");
    Ok(Json(rate))
}
