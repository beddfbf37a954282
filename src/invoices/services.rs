//! Invoice number issuance

use chrono::{Datelike, Utc};

use crate::db::InvoiceCounterRepository;
use crate::error::{AppError, Result};
use crate::models::IssuedInvoiceNumber;

/// Take the next number for `(settings_group, year)`, defaulting to the
/// current UTC year.
///
/// The counter is advanced atomically by the store, so concurrent callers
/// never share a number. A number is never handed back, even if the
/// invoice it was taken for is abandoned.
pub async fn issue_invoice_number<S>(
    store: &S,
    settings_group: &str,
    year: Option<i32>,
    consumer_id: &str,
) -> Result<IssuedInvoiceNumber>
where
    S: InvoiceCounterRepository + ?Sized,
{
    let settings_group = settings_group.trim();
    let consumer_id = consumer_id.trim();
    if settings_group.is_empty() {
        return Err(AppError::BadRequest("settings_group must not be empty".to_string()));
    }
    if consumer_id.is_empty() {
        return Err(AppError::BadRequest("consumer_id must not be empty".to_string()));
    }

    let year = year.unwrap_or_else(|| Utc::now().year());
    if !(1..=9999).contains(&year) {
        return Err(AppError::BadRequest(format!("year {year} is out of range")));
    }

    let issued = store.next_invoice_number(settings_group, year, consumer_id).await?;
    tracing::info!(
        settings_group = %issued.settings_group,
        year = issued.year,
        number = issued.number,
        consumer_id = %issued.consumer_id,
        "Invoice number issued"
    );
    Ok(issued)
}
