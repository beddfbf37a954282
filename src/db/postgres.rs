//! Postgres-backed store

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Apartment, Booking, DailyRate, IssuedInvoiceNumber};

use super::queries;
use super::{ApartmentRepository, BookingRepository, DailyRateRepository, InvoiceCounterRepository};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ApartmentRepository for PgStore {
    async fn find_apartment(&self, id: Uuid) -> Result<Option<Apartment>> {
        queries::get_apartment(&self.pool, id).await
    }

    async fn upsert_apartment(&self, apartment: &Apartment) -> Result<()> {
        queries::upsert_apartment(&self.pool, apartment).await
    }
}

#[async_trait]
impl DailyRateRepository for PgStore {
    async fn find_daily_rate(&self, apartment_id: Uuid, date: NaiveDate) -> Result<Option<DailyRate>> {
        queries::get_daily_rate(&self.pool, apartment_id, date).await
    }

    async fn list_daily_rates(
        &self,
        apartment_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRate>> {
        queries::get_daily_rates_between(&self.pool, apartment_id, from, to).await
    }

    async fn upsert_daily_rate(&self, rate: &DailyRate) -> Result<()> {
        queries::upsert_daily_rate(&self.pool, rate).await
    }
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        queries::get_booking(&self.pool, id).await
    }

    async fn list_active_bookings(&self, apartment_id: Uuid) -> Result<Vec<Booking>> {
        queries::get_active_bookings(&self.pool, apartment_id).await
    }

    async fn list_external_bookings(&self, apartment_id: Uuid, channel: &str) -> Result<Vec<Booking>> {
        queries::get_external_bookings(&self.pool, apartment_id, channel).await
    }

    async fn has_overlapping_booking(
        &self,
        apartment_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool> {
        queries::has_overlapping_booking(&self.pool, apartment_id, check_in, check_out).await
    }

    async fn insert_booking_if_available(&self, booking: &Booking) -> Result<()> {
        queries::insert_booking_if_available(&self.pool, booking).await
    }

    async fn update_booking(&self, booking: &Booking) -> Result<()> {
        queries::update_booking(&self.pool, booking).await
    }

    async fn update_booking_if_available(&self, booking: &Booking) -> Result<()> {
        queries::update_booking_if_available(&self.pool, booking).await
    }
}

#[async_trait]
impl InvoiceCounterRepository for PgStore {
    async fn next_invoice_number(
        &self,
        settings_group: &str,
        year: i32,
        consumer_id: &str,
    ) -> Result<IssuedInvoiceNumber> {
        queries::next_invoice_number(&self.pool, settings_group, year, consumer_id).await
    }

    async fn invoice_number_log(&self, settings_group: &str, year: i32) -> Result<Vec<IssuedInvoiceNumber>> {
        queries::get_invoice_number_log(&self.pool, settings_group, year).await
    }
}
