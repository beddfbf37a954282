//! Response DTOs for pricing API endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::resolver::{NightlyPrice, PriceSource};
use super::services::StayQuote;

/// Money value for JSON responses
#[derive(Debug, Clone, Serialize)]
pub struct MoneyResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
}

/// One priced night
#[derive(Debug, Serialize)]
pub struct NightResponse {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub source: PriceSource,
}

impl From<NightlyPrice> for NightResponse {
    fn from(night: NightlyPrice) -> Self {
        Self {
            date: night.date,
            amount: night.amount,
            source: night.source,
        }
    }
}

/// Response for a stay quote
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub apartment_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub night_count: u32,
    pub nights: Vec<NightResponse>,
    pub total: MoneyResponse,
}

impl From<StayQuote> for QuoteResponse {
    fn from(quote: StayQuote) -> Self {
        Self {
            apartment_id: quote.apartment_id,
            check_in: quote.check_in,
            check_out: quote.check_out,
            guest_count: quote.guest_count,
            night_count: quote.night_count(),
            total: MoneyResponse {
                amount: quote.total,
                currency: quote.currency,
            },
            nights: quote.nights.into_iter().map(NightResponse::from).collect(),
        }
    }
}

/// Response for a single night
#[derive(Debug, Serialize)]
pub struct NightlyPriceResponse {
    pub apartment_id: Uuid,
    pub guest_count: u32,
    pub night: NightResponse,
    pub currency: String,
}
