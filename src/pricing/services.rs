//! Pricing service functions with database access.
//!
//! These functions read apartments (through the cache) and daily rates from the
//! store, then hand the data to the pure resolver and calculators.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::cache::AppCache;
use crate::config::StayRangePolicy;
use crate::db::{ApartmentRepository, DailyRateRepository};
use crate::error::AppError;
use crate::models::{Apartment, DailyRate};

use super::calculators::{night_dates, round_money, stay_nights};
use super::resolver::{resolve_night, NightlyPrice};

/// Pricing calculation error types
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Apartment {0} not found")]
    ApartmentNotFound(Uuid),

    #[error("Check-out {check_out} is not after check-in {check_in}")]
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::Store(inner) => inner,
            PricingError::ApartmentNotFound(_) => AppError::NotFound(err.to_string()),
            PricingError::InvalidRange { .. } => AppError::BadRequest(err.to_string()),
        }
    }
}

/// Per-night breakdown and total for a stay
#[derive(Debug, Clone, Serialize)]
pub struct StayQuote {
    pub apartment_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub currency: String,
    pub nights: Vec<NightlyPrice>,
    pub total: Decimal,
}

impl StayQuote {
    pub fn night_count(&self) -> u32 {
        u32::try_from(self.nights.len()).unwrap_or(u32::MAX)
    }
}

/// Number of nights to charge for `[check_in, check_out)`.
///
/// With [`StayRangePolicy::Clamp`] a same-day or inverted range is charged as
/// one night; with [`StayRangePolicy::Reject`] it is an error.
pub fn chargeable_nights(
    check_in: NaiveDate,
    check_out: NaiveDate,
    policy: StayRangePolicy,
) -> Result<u32, PricingError> {
    let nights = stay_nights(check_in, check_out);
    if nights >= 1 {
        return Ok(u32::try_from(nights).unwrap_or(u32::MAX));
    }
    match policy {
        StayRangePolicy::Clamp => Ok(1),
        StayRangePolicy::Reject => Err(PricingError::InvalidRange { check_in, check_out }),
    }
}

/// Check-out date actually charged for `[check_in, check_out)` under `policy`.
pub fn effective_check_out(
    check_in: NaiveDate,
    check_out: NaiveDate,
    policy: StayRangePolicy,
) -> Result<NaiveDate, PricingError> {
    let nights = chargeable_nights(check_in, check_out, policy)?;
    check_in
        .checked_add_days(Days::new(u64::from(nights)))
        .ok_or(PricingError::InvalidRange { check_in, check_out })
}

/// Price each of `nights` nights starting at `check_in`.
///
/// `rates` may hold any daily rates for the apartment; only those matching a
/// night's date are used.
pub fn price_nights(
    apartment: &Apartment,
    check_in: NaiveDate,
    nights: u32,
    rates: &[DailyRate],
    guest_count: u32,
) -> Vec<NightlyPrice> {
    let by_date: HashMap<NaiveDate, &DailyRate> = rates
        .iter()
        .filter(|rate| rate.apartment_id == apartment.id)
        .map(|rate| (rate.date, rate))
        .collect();

    night_dates(check_in, nights)
        .map(|date| resolve_night(apartment, date, by_date.get(&date).copied(), guest_count))
        .collect()
}

/// Total of a priced stay, rounded to cents once after summing the nights.
pub fn stay_total(nights: &[NightlyPrice]) -> Decimal {
    round_money(nights.iter().map(|night| night.amount).sum(), 2)
}

/// Load an apartment, serving from the cache when possible.
pub async fn load_apartment<S>(
    store: &S,
    cache: &AppCache,
    apartment_id: Uuid,
) -> Result<Arc<Apartment>, PricingError>
where
    S: ApartmentRepository + ?Sized,
{
    if let Some(cached) = cache.apartments.get(&apartment_id).await {
        tracing::debug!(%apartment_id, "Cache HIT for apartment");
        return Ok(cached);
    }

    tracing::debug!(%apartment_id, "Cache MISS for apartment");
    let apartment = store
        .find_apartment(apartment_id)
        .await?
        .ok_or(PricingError::ApartmentNotFound(apartment_id))?;
    let apartment = Arc::new(apartment);
    cache.apartments.insert(apartment_id, apartment.clone()).await;
    Ok(apartment)
}

/// Price one night, reading the daily rate for that date.
pub async fn nightly_price<S>(
    store: &S,
    cache: &AppCache,
    apartment_id: Uuid,
    date: NaiveDate,
    guest_count: u32,
) -> Result<NightlyPrice, PricingError>
where
    S: ApartmentRepository + DailyRateRepository + ?Sized,
{
    let apartment = load_apartment(store, cache, apartment_id).await?;
    let rate = store.find_daily_rate(apartment_id, date).await?;
    Ok(resolve_night(&apartment, date, rate.as_ref(), guest_count))
}

/// Quote a stay: resolve every night independently and sum.
pub async fn quote_stay<S>(
    store: &S,
    cache: &AppCache,
    apartment_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guest_count: u32,
    policy: StayRangePolicy,
) -> Result<StayQuote, PricingError>
where
    S: ApartmentRepository + DailyRateRepository + ?Sized,
{
    let apartment = load_apartment(store, cache, apartment_id).await?;
    let nights = chargeable_nights(check_in, check_out, policy)?;
    let last_night_exclusive = effective_check_out(check_in, check_out, policy)?;
    let rates = store
        .list_daily_rates(apartment_id, check_in, last_night_exclusive)
        .await?;

    let breakdown = price_nights(&apartment, check_in, nights, &rates, guest_count);
    let total = stay_total(&breakdown);

    tracing::debug!(
        %apartment_id,
        %check_in,
        %check_out,
        nights,
        guest_count,
        %total,
        "Stay priced"
    );

    Ok(StayQuote {
        apartment_id,
        check_in,
        check_out,
        guest_count,
        currency: apartment.currency.clone(),
        nights: breakdown,
        total,
    })
}

/// Authoritative total price for a stay.
pub async fn total_stay_price<S>(
    store: &S,
    cache: &AppCache,
    apartment_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guest_count: u32,
    policy: StayRangePolicy,
) -> Result<Decimal, PricingError>
where
    S: ApartmentRepository + DailyRateRepository + ?Sized,
{
    quote_stay(store, cache, apartment_id, check_in, check_out, guest_count, policy)
        .await
        .map(|quote| quote.total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_pricing_error_display() {
        let id = Uuid::nil();
        assert!(PricingError::ApartmentNotFound(id).to_string().contains(&id.to_string()));

        let err = PricingError::InvalidRange {
            check_in: date(2024, 5, 4),
            check_out: date(2024, 5, 1),
        };
        assert!(err.to_string().contains("2024-05-04"));
    }

    #[test]
    fn test_pricing_error_maps_to_app_error() {
        assert!(matches!(
            AppError::from(PricingError::ApartmentNotFound(Uuid::nil())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(PricingError::InvalidRange {
                check_in: date(2024, 5, 1),
                check_out: date(2024, 5, 1),
            }),
            AppError::BadRequest(_)
        ));
    }

    #[test]
    fn test_chargeable_nights_policy() {
        let (a, b) = (date(2024, 5, 1), date(2024, 5, 4));
        assert_eq!(chargeable_nights(a, b, StayRangePolicy::Reject).unwrap(), 3);
        assert_eq!(chargeable_nights(a, a, StayRangePolicy::Clamp).unwrap(), 1);
        assert_eq!(chargeable_nights(b, a, StayRangePolicy::Clamp).unwrap(), 1);
        assert!(matches!(
            chargeable_nights(a, a, StayRangePolicy::Reject),
            Err(PricingError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_stay_total_rounds_after_summing() {
        let night = |amount| NightlyPrice {
            date: date(2024, 5, 1),
            amount,
            source: crate::pricing::resolver::PriceSource::Base,
        };
        assert_eq!(stay_total(&[night(dec!(101.13750))]), dec!(101.14));
        // Three thirds of a cent add up before rounding, not after.
        let third = dec!(0.003333);
        assert_eq!(stay_total(&[night(third), night(third), night(third)]), dec!(0.01));
        assert_eq!(stay_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_effective_check_out_clamps_to_one_night() {
        let a = date(2024, 5, 1);
        assert_eq!(
            effective_check_out(a, a, StayRangePolicy::Clamp).unwrap(),
            date(2024, 5, 2)
        );
        assert_eq!(
            effective_check_out(a, date(2024, 5, 4), StayRangePolicy::Reject).unwrap(),
            date(2024, 5, 4)
        );
    }
}
