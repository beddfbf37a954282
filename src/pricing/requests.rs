//! Request DTOs for pricing API endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Request to quote a stay
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub apartment_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default = "default_guest_count")]
    pub guest_count: u32,
}

/// Request to price a single night.
///
/// The night is given either as a calendar `date` or as an instant `at`,
/// which is reduced to its UTC date.
#[derive(Debug, Deserialize)]
pub struct NightlyPriceRequest {
    pub apartment_id: Uuid,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
    #[serde(default = "default_guest_count")]
    pub guest_count: u32,
}

fn default_guest_count() -> u32 {
    1
}
