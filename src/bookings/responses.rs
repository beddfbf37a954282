//! Response DTOs for booking endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Booking, BookingSource, BookingStatus, Guest, PaymentStatus};
use crate::pricing::responses::MoneyResponse;

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub apartment_id: Uuid,
    pub guest: Guest,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub guest_count: u32,
    pub total: MoneyResponse,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub source: BookingSource,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            apartment_id: booking.apartment_id,
            nights: (booking.check_out - booking.check_in).num_days(),
            guest: booking.guest,
            check_in: booking.check_in,
            check_out: booking.check_out,
            guest_count: booking.guest_count,
            total: MoneyResponse {
                amount: booking.total_price,
                currency: booking.currency,
            },
            status: booking.status,
            payment_status: booking.payment_status,
            source: booking.source,
            notes: booking.notes,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}
