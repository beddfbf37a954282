//! Pricing route handlers

use axum::{extract::State, routing::post, Json, Router};

use crate::error::{AppError, Result};
use crate::AppState;

use super::requests::{NightlyPriceRequest, QuoteRequest};
use super::resolver::utc_calendar_date;
use super::responses::{NightlyPriceResponse, QuoteResponse};
use super::services::{load_apartment, nightly_price, quote_stay};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pricing/quote", post(quote))
        .route("/pricing/nightly", post(nightly))
}

async fn quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>> {
    let quote = quote_stay(
        state.store.as_ref(),
        &state.cache,
        req.apartment_id,
        req.check_in,
        req.check_out,
        req.guest_count,
        state.config.stay_range_policy,
    )
    .await?;
    Ok(Json(quote.into()))
}

async fn nightly(
    State(state): State<AppState>,
    Json(req): Json<NightlyPriceRequest>,
) -> Result<Json<NightlyPriceResponse>> {
    let date = req
        .date
        .or_else(|| req.at.map(utc_calendar_date))
        .ok_or_else(|| AppError::BadRequest("either date or at is required".to_string()))?;

    let night = nightly_price(state.store.as_ref(), &state.cache, req.apartment_id, date, req.guest_count).await?;
    let apartment = load_apartment(state.store.as_ref(), &state.cache, req.apartment_id).await?;

    Ok(Json(NightlyPriceResponse {
        apartment_id: req.apartment_id,
        guest_count: req.guest_count,
        night: night.into(),
        currency: apartment.currency.clone(),
    }))
}
