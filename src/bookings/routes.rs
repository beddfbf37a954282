//! Booking route handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::db::BookingRepository;
use crate::error::{AppError, Result};
use crate::AppState;

use super::requests::CreateBookingRequest;
use super::responses::BookingResponse;
use super::services::{cancel_booking, create_booking, BookingPolicies};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create))
        .route("/bookings/:id", get(show))
        .route("/bookings/:id/cancel", post(cancel))
}

async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>)> {
    let policies = BookingPolicies {
        stay_range: state.config.stay_range_policy,
        feed_failure: state.config.feed_failure_policy,
    };
    let booking = create_booking(
        state.store.as_ref(),
        state.feed.as_ref(),
        &state.cache,
        policies,
        req.into(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BookingResponse>> {
    let booking = state
        .store
        .find_booking(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {id} not found")))?;
    Ok(Json(booking.into()))
}

async fn cancel(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BookingResponse>> {
    let booking = cancel_booking(state.store.as_ref(), id).await?;
    Ok(Json(booking.into()))
}
