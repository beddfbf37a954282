//! Invoice numbering models

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A number handed out by the invoice counter, together with its log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedInvoiceNumber {
    pub settings_group: String,
    pub year: i32,
    pub number: i64,
    pub consumer_id: String,
    pub issued_at: DateTime<Utc>,
}

impl IssuedInvoiceNumber {
    /// Human-facing form, e.g. `INV-2024-0042`.
    pub fn formatted(&self, prefix: &str) -> String {
        format!("{}-{}-{:04}", prefix, self.year, self.number)
    }
}
