//! Booking creation and cancellation.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::availability::feed::{CalendarFeed, FeedError};
use crate::availability::services::{check_stay_rules, fetch_external_calendars, UnavailableReason};
use crate::cache::AppCache;
use crate::config::{FeedFailurePolicy, StayRangePolicy};
use crate::db::{ApartmentRepository, BookingRepository, DailyRateRepository};
use crate::error::AppError;
use crate::models::{Booking, BookingSource, BookingStatus, Guest, PaymentStatus};
use crate::pricing::calculators::round_money;
use crate::pricing::services::{
    chargeable_nights, effective_check_out, load_apartment, price_nights, stay_total,
};
use crate::pricing::PricingError;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Guest count {guest_count} must be between 1 and {max_guests}")]
    InvalidGuestCount { guest_count: u32, max_guests: u32 },

    #[error("Booking status must be tentative or confirmed, got {0}")]
    InvalidStatus(&'static str),

    #[error("Apartment is not available: {0}")]
    Unavailable(UnavailableReason),

    #[error(transparent)]
    FeedUnavailable(FeedError),

    #[error("Booking {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Store(inner) => inner,
            BookingError::Pricing(inner) => inner.into(),
            BookingError::FeedUnavailable(inner) => inner.into(),
            BookingError::Unavailable(_) => AppError::Conflict(err.to_string()),
            BookingError::NotFound(_) => AppError::NotFound(err.to_string()),
            BookingError::InvalidGuestCount { .. } | BookingError::InvalidStatus(_) => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

/// A direct booking request as received from a client.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub apartment_id: Uuid,
    pub guest: Guest,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub status: BookingStatus,
    /// Price the client displayed. Informational only.
    pub client_total: Option<Decimal>,
    pub notes: Option<String>,
}

/// Policies applied while creating a booking.
#[derive(Debug, Clone, Copy)]
pub struct BookingPolicies {
    pub stay_range: StayRangePolicy,
    pub feed_failure: FeedFailurePolicy,
}

/// Validate, price and persist a direct booking.
///
/// The stored total is always the server-side price; a differing client
/// price is logged and discarded. Persistence re-checks overlap atomically,
/// so two racing requests for the same nights cannot both succeed.
pub async fn create_booking<S>(
    store: &S,
    feed: &dyn CalendarFeed,
    cache: &AppCache,
    policies: BookingPolicies,
    request: NewBooking,
) -> Result<Booking, BookingError>
where
    S: ApartmentRepository + DailyRateRepository + BookingRepository + ?Sized,
{
    if !request.status.occupies_calendar() {
        return Err(BookingError::InvalidStatus(request.status.as_str()));
    }

    let apartment = load_apartment(store, cache, request.apartment_id).await?;
    if request.guest_count == 0 || request.guest_count > apartment.max_guests {
        return Err(BookingError::InvalidGuestCount {
            guest_count: request.guest_count,
            max_guests: apartment.max_guests,
        });
    }

    let check_in = request.check_in;
    let nights = chargeable_nights(check_in, request.check_out, policies.stay_range)?;
    let check_out = effective_check_out(check_in, request.check_out, policies.stay_range)?;

    let rates = store.list_daily_rates(apartment.id, check_in, check_out).await?;
    check_stay_rules(check_in, nights, &rates).map_err(BookingError::Unavailable)?;

    if store
        .has_overlapping_booking(apartment.id, check_in, check_out)
        .await?
    {
        return Err(BookingError::Unavailable(UnavailableReason::Booked));
    }

    let external = fetch_external_calendars(feed, &apartment.ical_import_urls).await;
    if let Some(url) = external.conflicting_feed(check_in, check_out) {
        return Err(BookingError::Unavailable(UnavailableReason::ExternalCalendar {
            url: url.to_string(),
        }));
    }
    if let Some(failure) = external.failures.into_iter().next() {
        match policies.feed_failure {
            FeedFailurePolicy::FailClosed => return Err(BookingError::FeedUnavailable(failure)),
            FeedFailurePolicy::Degrade => {
                tracing::warn!(
                    apartment_id = %apartment.id,
                    error = %failure,
                    "Accepting booking without a complete external availability check"
                );
            }
        }
    }

    let breakdown = price_nights(&apartment, check_in, nights, &rates, request.guest_count);
    let total = stay_total(&breakdown);

    if let Some(client_total) = request.client_total {
        if round_money(client_total, 2) != total {
            tracing::warn!(
                apartment_id = %apartment.id,
                client_total = %client_total,
                server_total = %total,
                "Client price differs from server price, using server price"
            );
        }
    }

    let now = Utc::now();
    let booking = Booking {
        id: Uuid::new_v4(),
        apartment_id: apartment.id,
        guest: request.guest,
        check_in,
        check_out,
        guest_count: request.guest_count,
        total_price: total,
        currency: apartment.currency.clone(),
        status: request.status,
        payment_status: PaymentStatus::Unpaid,
        source: BookingSource::Direct,
        notes: request.notes,
        created_at: now,
        updated_at: now,
    };

    store.insert_booking_if_available(&booking).await?;

    tracing::info!(
        booking_id = %booking.id,
        apartment_id = %booking.apartment_id,
        %check_in,
        %check_out,
        total = %booking.total_price,
        "Booking created"
    );
    Ok(booking)
}

/// Cancel a booking, freeing its nights. Cancelling twice is a no-op.
pub async fn cancel_booking<S>(store: &S, booking_id: Uuid) -> Result<Booking, BookingError>
where
    S: BookingRepository + ?Sized,
{
    let mut booking = store
        .find_booking(booking_id)
        .await?
        .ok_or(BookingError::NotFound(booking_id))?;

    if booking.status == BookingStatus::Cancelled {
        return Ok(booking);
    }

    booking.status = BookingStatus::Cancelled;
    booking.updated_at = Utc::now();
    store.update_booking(&booking).await?;

    tracing::info!(%booking_id, "Booking cancelled");
    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_booking_error_status_mapping() {
        let cases = [
            (
                BookingError::InvalidGuestCount {
                    guest_count: 9,
                    max_guests: 4,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                BookingError::Unavailable(UnavailableReason::Booked),
                StatusCode::CONFLICT,
            ),
            (
                BookingError::FeedUnavailable(FeedError::Unavailable {
                    url: "https://a.example/cal.ics".to_string(),
                    reason: "timed out".to_string(),
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (BookingError::NotFound(Uuid::nil()), StatusCode::NOT_FOUND),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_unavailable_message_names_reason() {
        let err = BookingError::Unavailable(UnavailableReason::MinStay {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            required: 3,
        });
        assert_eq!(
            err.to_string(),
            "Apartment is not available: stays starting 2024-05-01 require at least 3 nights"
        );
    }
}
