//! Storage seam: repository traits plus Postgres and in-memory backends

pub mod memory;
pub mod postgres;
pub mod queries;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Apartment, Booking, DailyRate, IssuedInvoiceNumber};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ApartmentRepository: Send + Sync {
    async fn find_apartment(&self, id: Uuid) -> Result<Option<Apartment>>;
    async fn upsert_apartment(&self, apartment: &Apartment) -> Result<()>;
}

#[async_trait]
pub trait DailyRateRepository: Send + Sync {
    async fn find_daily_rate(&self, apartment_id: Uuid, date: NaiveDate) -> Result<Option<DailyRate>>;
    /// Rates for `[from, to)`, ordered by date.
    async fn list_daily_rates(
        &self,
        apartment_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRate>>;
    async fn upsert_daily_rate(&self, rate: &DailyRate) -> Result<()>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>>;
    /// Tentative and confirmed bookings, by check-in.
    async fn list_active_bookings(&self, apartment_id: Uuid) -> Result<Vec<Booking>>;
    async fn list_external_bookings(&self, apartment_id: Uuid, channel: &str) -> Result<Vec<Booking>>;
    async fn has_overlapping_booking(
        &self,
        apartment_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool>;
    /// Atomically check for overlap and insert. `Conflict` when the nights are taken.
    async fn insert_booking_if_available(&self, booking: &Booking) -> Result<()>;
    async fn update_booking(&self, booking: &Booking) -> Result<()>;
    /// Like `update_booking`, but `Conflict` when the booking's new nights
    /// overlap another tentative or confirmed booking. Atomic like inserts.
    async fn update_booking_if_available(&self, booking: &Booking) -> Result<()>;
}

#[async_trait]
pub trait InvoiceCounterRepository: Send + Sync {
    /// Never returns the same number twice for one (settings_group, year).
    async fn next_invoice_number(
        &self,
        settings_group: &str,
        year: i32,
        consumer_id: &str,
    ) -> Result<IssuedInvoiceNumber>;
    async fn invoice_number_log(&self, settings_group: &str, year: i32) -> Result<Vec<IssuedInvoiceNumber>>;
}

/// Everything the application needs from persistence.
pub trait Store:
    ApartmentRepository + DailyRateRepository + BookingRepository + InvoiceCounterRepository
{
}

impl<T> Store for T where
    T: ApartmentRepository + DailyRateRepository + BookingRepository + InvoiceCounterRepository
{
}
