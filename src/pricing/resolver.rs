//! Per-night price source resolution.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Apartment, DailyRate};

use super::calculators::calculate_price;

/// Which price source produced a nightly price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriceSource {
    DailyRate,
    Season { name: String },
    Base,
}

/// One resolved night of a stay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightlyPrice {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub source: PriceSource,
}

/// Calendar date of an instant in UTC. All pricing comparisons happen on these.
pub fn utc_calendar_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Resolve the price for one night.
///
/// Precedence: a daily rate carrying a price, then the first seasonal window
/// containing the date, then the base price. A daily rate without a price is
/// ignored here. Whichever wins is priced for one night with the apartment's
/// guest surcharge rules.
pub fn resolve_night(
    apartment: &Apartment,
    date: NaiveDate,
    daily_rate: Option<&DailyRate>,
    guest_count: u32,
) -> NightlyPrice {
    let override_price = daily_rate
        .filter(|rate| rate.apartment_id == apartment.id && rate.date == date)
        .and_then(|rate| rate.price);

    let (unit_price, source) = if let Some(price) = override_price {
        (price, PriceSource::DailyRate)
    } else if let Some(window) = apartment.season_for(date) {
        (
            window.price,
            PriceSource::Season {
                name: window.name.clone(),
            },
        )
    } else {
        (apartment.base_price, PriceSource::Base)
    };

    NightlyPrice {
        date,
        amount: calculate_price(&apartment.price_config(unit_price), guest_count, 1),
        source,
    }
}

/// Amount-only form of [`resolve_night`].
pub fn resolve_nightly_price(
    apartment: &Apartment,
    date: NaiveDate,
    daily_rate: Option<&DailyRate>,
    guest_count: u32,
) -> Decimal {
    resolve_night(apartment, date, daily_rate, guest_count).amount
}
