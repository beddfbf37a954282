//! Booking records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Tentative,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Tentative => "tentative",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tentative" => Some(BookingStatus::Tentative),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    /// Statuses that hold the apartment's nights.
    pub fn occupies_calendar(self) -> bool {
        matches!(self, BookingStatus::Tentative | BookingStatus::Confirmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "partially_paid" => Some(PaymentStatus::PartiallyPaid),
            "paid" => Some(PaymentStatus::Paid),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// Where a booking came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingSource {
    Direct,
    /// Imported from a channel calendar; `external_id` is the feed UID.
    External { channel: String, external_id: String },
}

impl BookingSource {
    pub fn external_id(&self) -> Option<&str> {
        match self {
            BookingSource::Direct => None,
            BookingSource::External { external_id, .. } => Some(external_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub apartment_id: Uuid,
    pub guest: Guest,
    /// First occupied night.
    pub check_in: NaiveDate,
    /// Exclusive: the guest leaves this morning.
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub total_price: Decimal,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub source: BookingSource,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Half-open overlap with `[check_in, check_out)`.
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.check_in < check_out && self.check_out > check_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_names() {
        for status in [
            BookingStatus::Tentative,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("partially_paid"), Some(PaymentStatus::PartiallyPaid));
    }

    #[test]
    fn test_only_live_bookings_hold_nights() {
        assert!(BookingStatus::Tentative.occupies_calendar());
        assert!(BookingStatus::Confirmed.occupies_calendar());
        assert!(!BookingStatus::Cancelled.occupies_calendar());
        assert!(!BookingStatus::Completed.occupies_calendar());
    }

    #[test]
    fn test_source_serializes_with_tag() {
        let source = BookingSource::External {
            channel: "airbnb".to_string(),
            external_id: "abc@airbnb.com".to_string(),
        };
        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["type"], "external");
        assert_eq!(value["external_id"], "abc@airbnb.com");
        assert_eq!(source.external_id(), Some("abc@airbnb.com"));
        assert_eq!(BookingSource::Direct.external_id(), None);
    }
}
