//! In-process store for local development and tests

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Apartment, Booking, BookingSource, DailyRate, IssuedInvoiceNumber};

use super::{ApartmentRepository, BookingRepository, DailyRateRepository, InvoiceCounterRepository};

#[derive(Default)]
struct Tables {
    apartments: HashMap<Uuid, Apartment>,
    daily_rates: BTreeMap<(Uuid, NaiveDate), DailyRate>,
    bookings: HashMap<Uuid, Booking>,
}

#[derive(Default)]
struct Invoices {
    counters: HashMap<(String, i32), i64>,
    log: Vec<IssuedInvoiceNumber>,
}

/// Keeps every table in memory. Writes that must be atomic take the table lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    invoices: Mutex<Invoices>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApartmentRepository for MemoryStore {
    async fn find_apartment(&self, id: Uuid) -> Result<Option<Apartment>> {
        Ok(self.tables.read().await.apartments.get(&id).cloned())
    }

    async fn upsert_apartment(&self, apartment: &Apartment) -> Result<()> {
        self.tables
            .write()
            .await
            .apartments
            .insert(apartment.id, apartment.clone());
        Ok(())
    }
}

#[async_trait]
impl DailyRateRepository for MemoryStore {
    async fn find_daily_rate(&self, apartment_id: Uuid, date: NaiveDate) -> Result<Option<DailyRate>> {
        Ok(self
            .tables
            .read()
            .await
            .daily_rates
            .get(&(apartment_id, date))
            .cloned())
    }

    async fn list_daily_rates(
        &self,
        apartment_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRate>> {
        if to <= from {
            return Ok(Vec::new());
        }
        let tables = self.tables.read().await;
        Ok(tables
            .daily_rates
            .range((apartment_id, from)..(apartment_id, to))
            .map(|(_, rate)| rate.clone())
            .collect())
    }

    async fn upsert_daily_rate(&self, rate: &DailyRate) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.apartments.contains_key(&rate.apartment_id) {
            return Err(AppError::NotFound(format!(
                "apartment {} not found",
                rate.apartment_id
            )));
        }
        tables
            .daily_rates
            .insert((rate.apartment_id, rate.date), rate.clone());
        Ok(())
    }
}

fn overlaps_live_booking(
    tables: &Tables,
    apartment_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude: Option<Uuid>,
) -> bool {
    tables.bookings.values().any(|booking| {
        booking.apartment_id == apartment_id
            && Some(booking.id) != exclude
            && booking.status.occupies_calendar()
            && booking.overlaps(check_in, check_out)
    })
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn list_active_bookings(&self, apartment_id: Uuid) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.apartment_id == apartment_id && b.status.occupies_calendar())
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.check_in, b.created_at));
        Ok(bookings)
    }

    async fn list_external_bookings(&self, apartment_id: Uuid, channel: &str) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.apartment_id == apartment_id)
            .filter(|b| matches!(&b.source, BookingSource::External { channel: c, .. } if c == channel))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.check_in, b.created_at));
        Ok(bookings)
    }

    async fn has_overlapping_booking(
        &self,
        apartment_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(overlaps_live_booking(&tables, apartment_id, check_in, check_out, None))
    }

    async fn insert_booking_if_available(&self, booking: &Booking) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.apartments.contains_key(&booking.apartment_id) {
            return Err(AppError::NotFound(format!(
                "apartment {} not found",
                booking.apartment_id
            )));
        }
        if tables.bookings.contains_key(&booking.id) {
            return Err(AppError::Conflict(format!("booking {} already exists", booking.id)));
        }
        if booking.status.occupies_calendar()
            && overlaps_live_booking(&tables, booking.apartment_id, booking.check_in, booking.check_out, None)
        {
            return Err(already_booked(booking));
        }
        tables.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update_booking(&self, booking: &Booking) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.bookings.get_mut(&booking.id) {
            Some(existing) => {
                *existing = booking.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("booking {} not found", booking.id))),
        }
    }

    async fn update_booking_if_available(&self, booking: &Booking) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.bookings.contains_key(&booking.id) {
            return Err(AppError::NotFound(format!("booking {} not found", booking.id)));
        }
        if booking.status.occupies_calendar()
            && overlaps_live_booking(
                &tables,
                booking.apartment_id,
                booking.check_in,
                booking.check_out,
                Some(booking.id),
            )
        {
            return Err(already_booked(booking));
        }
        tables.bookings.insert(booking.id, booking.clone());
        Ok(())
    }
}

fn already_booked(booking: &Booking) -> AppError {
    AppError::Conflict(format!(
        "apartment {} is already booked between {} and {}",
        booking.apartment_id, booking.check_in, booking.check_out
    ))
}

#[async_trait]
impl InvoiceCounterRepository for MemoryStore {
    async fn next_invoice_number(
        &self,
        settings_group: &str,
        year: i32,
        consumer_id: &str,
    ) -> Result<IssuedInvoiceNumber> {
        let mut invoices = self.invoices.lock().await;
        let counter = invoices
            .counters
            .entry((settings_group.to_string(), year))
            .or_insert(0);
        *counter += 1;
        let issued = IssuedInvoiceNumber {
            settings_group: settings_group.to_string(),
            year,
            number: *counter,
            consumer_id: consumer_id.to_string(),
            issued_at: Utc::now(),
        };
        invoices.log.push(issued.clone());
        Ok(issued)
    }

    async fn invoice_number_log(&self, settings_group: &str, year: i32) -> Result<Vec<IssuedInvoiceNumber>> {
        let invoices = self.invoices.lock().await;
        let mut entries: Vec<IssuedInvoiceNumber> = invoices
            .log
            .iter()
            .filter(|entry| entry.settings_group == settings_group && entry.year == year)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.number);
        Ok(entries)
    }
}
