//! Postgres queries for apartments, rates, bookings and invoice counters

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    Apartment, Booking, BookingSource, BookingStatus, DailyRate, Guest, IssuedInvoiceNumber,
    PaymentStatus, PriceType, SeasonalWindow, SurchargeType,
};

/// Apartment row from `apartments`
#[derive(Debug, Clone, FromRow)]
pub struct ApartmentRow {
    pub id: Uuid,
    pub name: String,
    pub currency: String,
    pub base_price: Decimal,
    pub price_type: String,
    pub included_guests: i32,
    pub extra_guest_surcharge: Decimal,
    pub surcharge_type: String,
    pub max_guests: i32,
    pub seasonal_windows: Json<Vec<SeasonalWindow>>,
    pub ical_import_urls: Vec<String>,
}

impl TryFrom<ApartmentRow> for Apartment {
    type Error = AppError;

    fn try_from(row: ApartmentRow) -> Result<Self> {
        let price_type = PriceType::parse(&row.price_type).ok_or_else(|| {
            AppError::Internal(format!("apartment {} has price_type '{}'", row.id, row.price_type))
        })?;
        let surcharge_type = SurchargeType::parse(&row.surcharge_type).ok_or_else(|| {
            AppError::Internal(format!(
                "apartment {} has surcharge_type '{}'",
                row.id, row.surcharge_type
            ))
        })?;

        Ok(Apartment {
            id: row.id,
            name: row.name,
            currency: row.currency,
            base_price: row.base_price,
            price_type,
            included_guests: non_negative(row.included_guests),
            extra_guest_surcharge: row.extra_guest_surcharge,
            surcharge_type,
            max_guests: non_negative(row.max_guests),
            seasonal_windows: row.seasonal_windows.0,
            ical_import_urls: row.ical_import_urls,
        })
    }
}

/// Daily rate row from `daily_rates`
#[derive(Debug, Clone, FromRow)]
pub struct DailyRateRow {
    pub apartment_id: Uuid,
    pub date: NaiveDate,
    pub price: Option<Decimal>,
    pub is_blocked: bool,
    pub min_stay: Option<i32>,
}

impl From<DailyRateRow> for DailyRate {
    fn from(row: DailyRateRow) -> Self {
        DailyRate {
            apartment_id: row.apartment_id,
            date: row.date,
            price: row.price,
            is_blocked: row.is_blocked,
            min_stay: row.min_stay.map(non_negative),
        }
    }
}

/// Booking row from `bookings`
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub apartment_id: Uuid,
    pub guest_name: String,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: i32,
    pub total_price: Decimal,
    pub currency: String,
    pub status: String,
    pub payment_status: String,
    pub source: String,
    pub channel: Option<String>,
    pub external_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self> {
        let status = BookingStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(format!("booking {} has status '{}'", row.id, row.status))
        })?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            AppError::Internal(format!(
                "booking {} has payment_status '{}'",
                row.id, row.payment_status
            ))
        })?;
        let source = match (row.source.as_str(), row.channel, row.external_id) {
            ("external", Some(channel), Some(external_id)) => {
                BookingSource::External { channel, external_id }
            }
            ("direct", _, _) => BookingSource::Direct,
            (other, _, _) => {
                return Err(AppError::Internal(format!(
                    "booking {} has inconsistent source '{}'",
                    row.id, other
                )))
            }
        };

        Ok(Booking {
            id: row.id,
            apartment_id: row.apartment_id,
            guest: Guest {
                name: row.guest_name,
                email: row.guest_email,
                phone: row.guest_phone,
            },
            check_in: row.check_in,
            check_out: row.check_out,
            guest_count: non_negative(row.guest_count),
            total_price: row.total_price,
            currency: row.currency,
            status,
            payment_status,
            source,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn as_db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

const BOOKING_COLUMNS: &str = r#"
    id, apartment_id, guest_name, guest_email, guest_phone,
    check_in, check_out, guest_count, total_price, currency,
    status, payment_status, source, channel, external_id, notes,
    created_at, updated_at
"#;

// ==================== apartments ====================

/// Get an apartment by id
pub async fn get_apartment(pool: &PgPool, id: Uuid) -> Result<Option<Apartment>> {
    let row = sqlx::query_as::<_, ApartmentRow>(
        r#"
        SELECT
            id, name, currency, base_price, price_type, included_guests,
            extra_guest_surcharge, surcharge_type, max_guests,
            seasonal_windows, ical_import_urls
        FROM apartments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Apartment::try_from).transpose()
}

/// Insert or replace an apartment's configuration
pub async fn upsert_apartment(pool: &PgPool, apartment: &Apartment) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO apartments (
            id, name, currency, base_price, price_type, included_guests,
            extra_guest_surcharge, surcharge_type, max_guests,
            seasonal_windows, ical_import_urls
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            currency = EXCLUDED.currency,
            base_price = EXCLUDED.base_price,
            price_type = EXCLUDED.price_type,
            included_guests = EXCLUDED.included_guests,
            extra_guest_surcharge = EXCLUDED.extra_guest_surcharge,
            surcharge_type = EXCLUDED.surcharge_type,
            max_guests = EXCLUDED.max_guests,
            seasonal_windows = EXCLUDED.seasonal_windows,
            ical_import_urls = EXCLUDED.ical_import_urls,
            updated_at = now()
        "#,
    )
    .bind(apartment.id)
    .bind(&apartment.name)
    .bind(&apartment.currency)
    .bind(apartment.base_price)
    .bind(apartment.price_type.as_str())
    .bind(as_db_int(apartment.included_guests))
    .bind(apartment.extra_guest_surcharge)
    .bind(apartment.surcharge_type.as_str())
    .bind(as_db_int(apartment.max_guests))
    .bind(Json(&apartment.seasonal_windows))
    .bind(&apartment.ical_import_urls)
    .execute(pool)
    .await?;

    Ok(())
}

// ==================== daily rates ====================

/// Get the daily rate for one apartment and day
pub async fn get_daily_rate(
    pool: &PgPool,
    apartment_id: Uuid,
    date: NaiveDate,
) -> Result<Option<DailyRate>> {
    let row = sqlx::query_as::<_, DailyRateRow>(
        r#"
        SELECT apartment_id, date, price, is_blocked, min_stay
        FROM daily_rates
        WHERE apartment_id = $1 AND date = $2
        "#,
    )
    .bind(apartment_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(DailyRate::from))
}

/// Get daily rates for `[from, to)`, ordered by date
pub async fn get_daily_rates_between(
    pool: &PgPool,
    apartment_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DailyRate>> {
    let rows = sqlx::query_as::<_, DailyRateRow>(
        r#"
        SELECT apartment_id, date, price, is_blocked, min_stay
        FROM daily_rates
        WHERE apartment_id = $1
          AND date >= $2
          AND date < $3
        ORDER BY date
        "#,
    )
    .bind(apartment_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DailyRate::from).collect())
}

/// Insert or replace the daily rate for (apartment, date)
pub async fn upsert_daily_rate(pool: &PgPool, rate: &DailyRate) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_rates (apartment_id, date, price, is_blocked, min_stay)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (apartment_id, date) DO UPDATE SET
            price = EXCLUDED.price,
            is_blocked = EXCLUDED.is_blocked,
            min_stay = EXCLUDED.min_stay
        "#,
    )
    .bind(rate.apartment_id)
    .bind(rate.date)
    .bind(rate.price)
    .bind(rate.is_blocked)
    .bind(rate.min_stay.map(as_db_int))
    .execute(pool)
    .await?;

    Ok(())
}

// ==================== bookings ====================

/// Get a booking by id
pub async fn get_booking(pool: &PgPool, id: Uuid) -> Result<Option<Booking>> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Booking::try_from).transpose()
}

/// Tentative and confirmed bookings for an apartment, by check-in
pub async fn get_active_bookings(pool: &PgPool, apartment_id: Uuid) -> Result<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE apartment_id = $1
          AND status IN ('tentative', 'confirmed')
        ORDER BY check_in
        "#
    ))
    .bind(apartment_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Booking::try_from).collect()
}

/// Bookings imported from one channel for an apartment
pub async fn get_external_bookings(
    pool: &PgPool,
    apartment_id: Uuid,
    channel: &str,
) -> Result<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE apartment_id = $1
          AND source = 'external'
          AND channel = $2
        ORDER BY check_in
        "#
    ))
    .bind(apartment_id)
    .bind(channel)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Booking::try_from).collect()
}

/// Overlap with live bookings, ignoring `exclude` (the booking being moved).
async fn overlapping_booking_exists(
    tx: &mut Transaction<'_, Postgres>,
    apartment_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude: Option<Uuid>,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM bookings
            WHERE apartment_id = $1
              AND status IN ('tentative', 'confirmed')
              AND check_in < $3
              AND check_out > $2
              AND ($4::uuid IS NULL OR id <> $4)
        )
        "#,
    )
    .bind(apartment_id)
    .bind(check_in)
    .bind(check_out)
    .bind(exclude)
    .fetch_one(&mut **tx)
    .await?;

    Ok(exists)
}

/// Lock the apartment row so booking writes for it are serialized.
async fn lock_apartment(tx: &mut Transaction<'_, Postgres>, apartment_id: Uuid) -> Result<()> {
    let locked: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM apartments WHERE id = $1 FOR UPDATE")
            .bind(apartment_id)
            .fetch_optional(&mut **tx)
            .await?;
    if locked.is_none() {
        return Err(AppError::NotFound(format!("apartment {apartment_id} not found")));
    }
    Ok(())
}

fn already_booked(booking: &Booking) -> AppError {
    AppError::Conflict(format!(
        "apartment {} is already booked between {} and {}",
        booking.apartment_id, booking.check_in, booking.check_out
    ))
}

/// Whether any tentative/confirmed booking overlaps `[check_in, check_out)`
pub async fn has_overlapping_booking(
    pool: &PgPool,
    apartment_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<bool> {
    let mut tx = pool.begin().await?;
    let exists = overlapping_booking_exists(&mut tx, apartment_id, check_in, check_out, None).await?;
    tx.commit().await?;
    Ok(exists)
}

/// Insert a booking unless it overlaps a live booking on the same apartment.
///
/// The apartment row is locked for the duration of the transaction so two
/// concurrent inserts for the same apartment are serialized.
pub async fn insert_booking_if_available(pool: &PgPool, booking: &Booking) -> Result<()> {
    let mut tx = pool.begin().await?;
    lock_apartment(&mut tx, booking.apartment_id).await?;

    if booking.status.occupies_calendar()
        && overlapping_booking_exists(&mut tx, booking.apartment_id, booking.check_in, booking.check_out, None)
            .await?
    {
        return Err(already_booked(booking));
    }

    bind_booking(sqlx::query(
        r#"
        INSERT INTO bookings (
            id, apartment_id, guest_name, guest_email, guest_phone,
            check_in, check_out, guest_count, total_price, currency,
            status, payment_status, source, channel, external_id, notes,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#,
    ), booking)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

const UPDATE_BOOKING_SQL: &str = r#"
    UPDATE bookings SET
        apartment_id = $2, guest_name = $3, guest_email = $4, guest_phone = $5,
        check_in = $6, check_out = $7, guest_count = $8, total_price = $9, currency = $10,
        status = $11, payment_status = $12, source = $13, channel = $14, external_id = $15,
        notes = $16, created_at = $17, updated_at = $18
    WHERE id = $1
"#;

/// Overwrite a booking's mutable fields
pub async fn update_booking(pool: &PgPool, booking: &Booking) -> Result<()> {
    let result = bind_booking(sqlx::query(UPDATE_BOOKING_SQL), booking)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("booking {} not found", booking.id)));
    }
    Ok(())
}

/// Overwrite a booking unless its new nights overlap another live booking.
///
/// Runs under the same apartment row lock as inserts.
pub async fn update_booking_if_available(pool: &PgPool, booking: &Booking) -> Result<()> {
    let mut tx = pool.begin().await?;
    lock_apartment(&mut tx, booking.apartment_id).await?;

    if booking.status.occupies_calendar()
        && overlapping_booking_exists(
            &mut tx,
            booking.apartment_id,
            booking.check_in,
            booking.check_out,
            Some(booking.id),
        )
        .await?
    {
        return Err(already_booked(booking));
    }

    let result = bind_booking(sqlx::query(UPDATE_BOOKING_SQL), booking)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("booking {} not found", booking.id)));
    }

    tx.commit().await?;
    Ok(())
}

fn bind_booking<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    booking: &'q Booking,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    let (source, channel, external_id) = match &booking.source {
        BookingSource::Direct => ("direct", None, None),
        BookingSource::External { channel, external_id } => {
            ("external", Some(channel.as_str()), Some(external_id.as_str()))
        }
    };

    query
        .bind(booking.id)
        .bind(booking.apartment_id)
        .bind(&booking.guest.name)
        .bind(booking.guest.email.as_deref())
        .bind(booking.guest.phone.as_deref())
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(as_db_int(booking.guest_count))
        .bind(booking.total_price)
        .bind(&booking.currency)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(source)
        .bind(channel)
        .bind(external_id)
        .bind(booking.notes.as_deref())
        .bind(booking.created_at)
        .bind(booking.updated_at)
}

// ==================== invoice counters ====================

/// Issue the next invoice number for (settings_group, year) and log it.
///
/// The counter upsert takes a row lock, so concurrent callers for the same
/// key are serialized and each receives a distinct number. The log insert
/// commits in the same transaction.
pub async fn next_invoice_number(
    pool: &PgPool,
    settings_group: &str,
    year: i32,
    consumer_id: &str,
) -> Result<IssuedInvoiceNumber> {
    let mut tx = pool.begin().await?;

    let number: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_counters (settings_group, year, last_number)
        VALUES ($1, $2, 1)
        ON CONFLICT (settings_group, year)
        DO UPDATE SET last_number = invoice_counters.last_number + 1
        RETURNING last_number
        "#,
    )
    .bind(settings_group)
    .bind(year)
    .fetch_one(&mut *tx)
    .await?;

    let issued_at: DateTime<Utc> = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_number_log (settings_group, year, number, consumer_id)
        VALUES ($1, $2, $3, $4)
        RETURNING issued_at
        "#,
    )
    .bind(settings_group)
    .bind(year)
    .bind(number)
    .bind(consumer_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(IssuedInvoiceNumber {
        settings_group: settings_group.to_string(),
        year,
        number,
        consumer_id: consumer_id.to_string(),
        issued_at,
    })
}

/// Issue log for (settings_group, year), by number
pub async fn get_invoice_number_log(
    pool: &PgPool,
    settings_group: &str,
    year: i32,
) -> Result<Vec<IssuedInvoiceNumber>> {
    let rows: Vec<(String, i32, i64, String, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT settings_group, year, number, consumer_id, issued_at
        FROM invoice_number_log
        WHERE settings_group = $1 AND year = $2
        ORDER BY number
        "#,
    )
    .bind(settings_group)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(settings_group, year, number, consumer_id, issued_at)| IssuedInvoiceNumber {
            settings_group,
            year,
            number,
            consumer_id,
            issued_at,
        })
        .collect())
}
