//! Availability, calendar export and feed sync route handlers

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{BookingRepository, DailyRateRepository};
use crate::error::Result;
use crate::pricing::services::{effective_check_out, load_apartment};
use crate::AppState;

use super::ical::export_calendar;
use super::services::{check_availability, AvailabilityReport};
use super::sync::{sync_apartment_feeds, SyncSummary};

/// How far ahead blocked days are exported.
const EXPORT_HORIZON_DAYS: u64 = 730;

#[derive(Debug, Deserialize)]
pub struct CheckAvailabilityRequest {
    pub apartment_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/availability/check", post(check))
        .route("/apartments/:id/calendar.ics", get(calendar))
        .route("/apartments/:id/ical/sync", post(sync))
}

async fn check(
    State(state): State<AppState>,
    Json(req): Json<CheckAvailabilityRequest>,
) -> Result<Json<AvailabilityReport>> {
    let check_out = effective_check_out(req.check_in, req.check_out, state.config.stay_range_policy)?;
    let apartment = load_apartment(state.store.as_ref(), &state.cache, req.apartment_id).await?;

    let report = check_availability(
        state.store.as_ref(),
        state.feed.as_ref(),
        &apartment,
        req.check_in,
        check_out,
    )
    .await?;
    Ok(Json(report))
}

/// Our own calendar, for channels to import.
async fn calendar(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let apartment = load_apartment(state.store.as_ref(), &state.cache, id).await?;
    let bookings = state.store.list_active_bookings(id).await?;

    let today = Utc::now().date_naive();
    let horizon = today
        .checked_add_days(Days::new(EXPORT_HORIZON_DAYS))
        .unwrap_or(NaiveDate::MAX);
    let rates = state.store.list_daily_rates(id, today, horizon).await?;

    let body = export_calendar(&apartment.name, &bookings, &rates, Utc::now());
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    ))
}

async fn sync(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SyncSummary>> {
    let apartment = load_apartment(state.store.as_ref(), &state.cache, id).await?;
    let summary = sync_apartment_feeds(state.store.as_ref(), state.feed.as_ref(), &apartment).await?;
    Ok(Json(summary))
}
