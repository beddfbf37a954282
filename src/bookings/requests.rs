//! Request DTOs for booking endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{BookingStatus, Guest};

use super::services::NewBooking;

/// Request to create a direct booking
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub apartment_id: Uuid,
    pub guest_name: String,
    #[serde(default)]
    pub guest_email: Option<String>,
    #[serde(default)]
    pub guest_phone: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    #[serde(default = "default_status")]
    pub status: BookingStatus,
    /// Total shown to the guest, as a JSON number or string. The server
    /// recomputes it.
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_status() -> BookingStatus {
    BookingStatus::Tentative
}

impl From<CreateBookingRequest> for NewBooking {
    fn from(req: CreateBookingRequest) -> Self {
        NewBooking {
            apartment_id: req.apartment_id,
            guest: Guest {
                name: req.guest_name,
                email: req.guest_email,
                phone: req.guest_phone,
            },
            check_in: req.check_in,
            check_out: req.check_out,
            guest_count: req.guest_count,
            status: req.status,
            client_total: req.total_price,
            notes: req.notes,
        }
    }
}
