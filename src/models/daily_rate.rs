//! Per-day rate overrides

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Override pinned to one calendar day. Unique per (apartment, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRate {
    pub apartment_id: Uuid,
    pub date: NaiveDate,
    /// `None` means the record only carries blocking / min-stay data.
    pub price: Option<Decimal>,
    #[serde(default)]
    pub is_blocked: bool,
    pub min_stay: Option<u32>,
}
