//! Request DTOs for apartment and daily-rate endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Apartment, DailyRate, PriceType, SeasonalWindow, SurchargeType};

/// Full apartment pricing configuration, replacing what is stored.
#[derive(Debug, Deserialize)]
pub struct UpsertApartmentRequest {
    pub name: String,
    #[serde(default)]
    pub currency: Option<String>,
    pub base_price: Decimal,
    #[serde(default)]
    pub price_type: PriceType,
    #[serde(default = "default_included_guests")]
    pub included_guests: u32,
    #[serde(default)]
    pub extra_guest_surcharge: Decimal,
    #[serde(default)]
    pub surcharge_type: SurchargeType,
    pub max_guests: u32,
    #[serde(default)]
    pub seasonal_windows: Vec<SeasonalWindow>,
    #[serde(default)]
    pub ical_import_urls: Vec<String>,
}

fn default_included_guests() -> u32 {
    1
}

impl UpsertApartmentRequest {
    pub fn into_apartment(self, id: Uuid, default_currency: &str) -> Result<Apartment> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }
        if self.base_price.is_sign_negative() || self.extra_guest_surcharge.is_sign_negative() {
            return Err(AppError::BadRequest("prices must not be negative".to_string()));
        }
        if self.max_guests == 0 {
            return Err(AppError::BadRequest("max_guests must be at least 1".to_string()));
        }
        for window in &self.seasonal_windows {
            if window.end_date < window.start_date {
                return Err(AppError::BadRequest(format!(
                    "season '{}' ends before it starts",
                    window.name
                )));
            }
            if window.price.is_sign_negative() {
                return Err(AppError::BadRequest(format!(
                    "season '{}' has a negative price",
                    window.name
                )));
            }
        }

        let currency = self
            .currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| default_currency.to_string());

        Ok(Apartment {
            id,
            name: self.name.trim().to_string(),
            currency,
            base_price: self.base_price,
            price_type: self.price_type,
            included_guests: self.included_guests,
            extra_guest_surcharge: self.extra_guest_surcharge,
            surcharge_type: self.surcharge_type,
            max_guests: self.max_guests,
            seasonal_windows: self.seasonal_windows,
            ical_import_urls: self
                .ical_import_urls
                .into_iter()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect(),
        })
    }
}

/// Override, block or min-stay for one day.
#[derive(Debug, Deserialize)]
pub struct UpsertDailyRateRequest {
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub min_stay: Option<u32>,
}

impl UpsertDailyRateRequest {
    pub fn into_daily_rate(self, apartment_id: Uuid, date: NaiveDate) -> Result<DailyRate> {
        if self.price.is_some_and(|price| price.is_sign_negative()) {
            return Err(AppError::BadRequest("price must not be negative".to_string()));
        }
        if self.min_stay == Some(0) {
            return Err(AppError::BadRequest("min_stay must be at least 1".to_string()));
        }
        Ok(DailyRate {
            apartment_id,
            date,
            price: self.price,
            is_blocked: self.is_blocked,
            min_stay: self.min_stay,
        })
    }
}

/// `from` inclusive, `to` exclusive.
#[derive(Debug, Deserialize)]
pub struct DailyRateRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}
