//! Apartment pricing configuration

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the unit price is applied to guests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    /// One price per night for the whole apartment.
    #[default]
    Flat,
    /// Unit price is charged for every guest, every night.
    PerPerson,
}

impl PriceType {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceType::Flat => "flat",
            PriceType::PerPerson => "per_person",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "flat" => Some(PriceType::Flat),
            "per_person" => Some(PriceType::PerPerson),
            _ => None,
        }
    }
}

/// How the extra-guest surcharge amount is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurchargeType {
    #[default]
    Fixed,
    /// Surcharge amount is a percentage of the unit price.
    Percentage,
}

impl SurchargeType {
    pub fn as_str(self) -> &'static str {
        match self {
            SurchargeType::Fixed => "fixed",
            SurchargeType::Percentage => "percentage",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fixed" => Some(SurchargeType::Fixed),
            "percentage" => Some(SurchargeType::Percentage),
            _ => None,
        }
    }
}

/// Named date range with an override price. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalWindow {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price: Decimal,
}

impl SeasonalWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Inputs to the base price calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceConfig {
    pub unit_price: Decimal,
    pub price_type: PriceType,
    pub included_guests: u32,
    pub surcharge_amount: Decimal,
    pub surcharge_type: SurchargeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apartment {
    pub id: Uuid,
    pub name: String,
    pub currency: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub price_type: PriceType,
    pub included_guests: u32,
    #[serde(default)]
    pub extra_guest_surcharge: Decimal,
    #[serde(default)]
    pub surcharge_type: SurchargeType,
    pub max_guests: u32,
    /// Evaluated in stored order, first match wins.
    #[serde(default)]
    pub seasonal_windows: Vec<SeasonalWindow>,
    #[serde(default)]
    pub ical_import_urls: Vec<String>,
}

impl Apartment {
    /// Pricing configuration with `unit_price` substituted for the base price.
    /// Guest surcharge settings always come from the apartment.
    pub fn price_config(&self, unit_price: Decimal) -> PriceConfig {
        PriceConfig {
            unit_price,
            price_type: self.price_type,
            included_guests: self.included_guests,
            surcharge_amount: self.extra_guest_surcharge,
            surcharge_type: self.surcharge_type,
        }
    }

    pub fn season_for(&self, date: NaiveDate) -> Option<&SeasonalWindow> {
        self.seasonal_windows.iter().find(|window| window.contains(date))
    }
}
