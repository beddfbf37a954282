//! Availability for apartments.
//!
//! Combines persisted bookings, blocked days and minimum stays with the busy
//! periods published by external channels over iCal. Also exports our own
//! calendar and imports channel bookings.

pub mod checker;
pub mod feed;
pub mod ical;
pub mod routes;
pub mod services;
pub mod sync;

pub use checker::{first_conflict, is_available, BusyInterval};
pub use feed::{CalendarFeed, FeedError, HttpCalendarFeed};
pub use ical::{export_calendar, parse_calendar, EventStatus, FeedEvent};
pub use routes::router;
pub use services::{check_availability, AvailabilityReport, AvailabilityStatus, UnavailableReason};
pub use sync::{sync_apartment_feeds, SyncSummary};
