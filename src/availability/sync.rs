//! Import of channel bookings from iCal feeds.
//!
//! Feed events are matched to existing external bookings by UID. New events
//! become confirmed bookings, moved events update dates, and events that were
//! cancelled or vanished from the feed cancel the booking.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::db::BookingRepository;
use crate::error::{AppError, Result};
use crate::models::{
    Apartment, Booking, BookingSource, BookingStatus, Guest, PaymentStatus,
};

use super::feed::CalendarFeed;
use super::ical::{EventStatus, FeedEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    Create(Booking),
    Update(Booking),
    Cancel(Booking),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub events_total: usize,
    pub events_ignored: usize,
    pub created: usize,
    pub updated: usize,
    pub cancelled: usize,
    pub conflicts: usize,
    pub errors: Vec<String>,
}

impl SyncSummary {
    fn merge(&mut self, other: SyncSummary) {
        self.events_total += other.events_total;
        self.events_ignored += other.events_ignored;
        self.created += other.created;
        self.updated += other.updated;
        self.cancelled += other.cancelled;
        self.conflicts += other.conflicts;
        self.errors.extend(other.errors);
    }
}

/// Channel name derived from a feed URL's host, e.g. `www.airbnb.com`.
pub fn channel_for_url(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('@')
        .next()
        .unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default().to_lowercase();
    if host.is_empty() {
        "ical".to_string()
    } else {
        host
    }
}

fn new_external_booking(
    apartment: &Apartment,
    channel: &str,
    event: &FeedEvent,
    now: DateTime<Utc>,
) -> Booking {
    let summary = event.summary.trim();
    Booking {
        id: Uuid::new_v4(),
        apartment_id: apartment.id,
        guest: Guest {
            name: if summary.is_empty() {
                channel.to_string()
            } else {
                summary.to_string()
            },
            email: None,
            phone: None,
        },
        check_in: event.start_date(),
        check_out: event.end_date(),
        guest_count: apartment.included_guests.max(1),
        // The channel collects payment; the price is unknown here.
        total_price: Decimal::ZERO,
        currency: apartment.currency.clone(),
        status: BookingStatus::Confirmed,
        payment_status: PaymentStatus::Unpaid,
        source: BookingSource::External {
            channel: channel.to_string(),
            external_id: event.uid.clone(),
        },
        notes: (!summary.is_empty()).then(|| format!("iCal: {summary}")),
        created_at: now,
        updated_at: now,
    }
}

fn with_dates(booking: &Booking, check_in: NaiveDate, check_out: NaiveDate, now: DateTime<Utc>) -> Booking {
    let mut updated = booking.clone();
    updated.check_in = check_in;
    updated.check_out = check_out;
    updated.status = BookingStatus::Confirmed;
    updated.updated_at = now;
    updated
}

fn cancelled(booking: &Booking, now: DateTime<Utc>) -> Booking {
    let mut updated = booking.clone();
    updated.status = BookingStatus::Cancelled;
    updated.updated_at = now;
    updated
}

/// Work out what a feed implies for the bookings previously imported from it.
///
/// Returns the actions and the number of feed events that were ignored (our
/// own exported events, and cancelled events never imported).
pub fn plan_sync(
    apartment: &Apartment,
    channel: &str,
    events: &[FeedEvent],
    existing: &[Booking],
    now: DateTime<Utc>,
) -> (Vec<SyncAction>, usize) {
    let by_uid: HashMap<&str, &Booking> = existing
        .iter()
        .filter_map(|booking| booking.source.external_id().map(|uid| (uid, booking)))
        .collect();

    let mut actions = Vec::new();
    let mut ignored = 0;
    let mut seen: HashSet<&str> = HashSet::new();

    for event in events {
        if event.is_exported_by_us() || !seen.insert(event.uid.as_str()) {
            ignored += 1;
            continue;
        }

        let existing_booking = by_uid.get(event.uid.as_str()).copied();
        match (existing_booking, event.status) {
            (Some(booking), EventStatus::Cancelled) => {
                if booking.status.occupies_calendar() {
                    actions.push(SyncAction::Cancel(cancelled(booking, now)));
                }
            }
            (None, EventStatus::Cancelled) => ignored += 1,
            (Some(booking), _) => {
                let (check_in, check_out) = (event.start_date(), event.end_date());
                let moved = booking.check_in != check_in || booking.check_out != check_out;
                let revived = booking.status == BookingStatus::Cancelled;
                if (moved && booking.status.occupies_calendar()) || revived {
                    actions.push(SyncAction::Update(with_dates(booking, check_in, check_out, now)));
                }
            }
            (None, _) => actions.push(SyncAction::Create(new_external_booking(
                apartment, channel, event, now,
            ))),
        }
    }

    for booking in existing {
        let Some(uid) = booking.source.external_id() else {
            continue;
        };
        if !seen.contains(uid) && booking.status.occupies_calendar() {
            actions.push(SyncAction::Cancel(cancelled(booking, now)));
        }
    }

    (actions, ignored)
}

/// Apply a sync plan. Individual failures are counted, not propagated.
pub async fn apply_sync<S>(store: &S, actions: Vec<SyncAction>) -> SyncSummary
where
    S: BookingRepository + ?Sized,
{
    let mut summary = SyncSummary::default();
    for action in actions {
        let outcome = match &action {
            SyncAction::Create(booking) => store.insert_booking_if_available(booking).await,
            SyncAction::Update(booking) => store.update_booking_if_available(booking).await,
            SyncAction::Cancel(booking) => store.update_booking(booking).await,
        };
        match (outcome, &action) {
            (Ok(()), SyncAction::Create(_)) => summary.created += 1,
            (Ok(()), SyncAction::Update(_)) => summary.updated += 1,
            (Ok(()), SyncAction::Cancel(_)) => summary.cancelled += 1,
            (Err(AppError::Conflict(msg)), _) => {
                summary.conflicts += 1;
                summary.errors.push(msg);
            }
            (Err(e), _) => summary.errors.push(e.to_string()),
        }
    }
    summary
}

/// Fetch every feed configured on the apartment and reconcile its bookings.
///
/// A feed that cannot be fetched leaves that channel's bookings untouched.
pub async fn sync_apartment_feeds<S>(
    store: &S,
    feed: &dyn CalendarFeed,
    apartment: &Apartment,
) -> Result<SyncSummary>
where
    S: BookingRepository + ?Sized,
{
    let mut total = SyncSummary::default();

    for url in &apartment.ical_import_urls {
        let channel = channel_for_url(url);
        let events = match feed.fetch_events(url).await {
            Ok(events) => events,
            Err(err) => {
                tracing::warn!(apartment_id = %apartment.id, url = %url, error = %err, "Skipping feed during sync");
                total.errors.push(err.to_string());
                continue;
            }
        };

        let existing = store.list_external_bookings(apartment.id, &channel).await?;
        let (actions, ignored) = plan_sync(apartment, &channel, &events, &existing, Utc::now());

        let mut summary = apply_sync(store, actions).await;
        summary.events_total = events.len();
        summary.events_ignored = ignored;

        tracing::info!(
            apartment_id = %apartment.id,
            channel = %channel,
            events = summary.events_total,
            created = summary.created,
            updated = summary.updated,
            cancelled = summary.cancelled,
            conflicts = summary.conflicts,
            "Calendar feed synced"
        );
        total.merge(summary);
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::checker::midnight_utc;
    use crate::models::{PriceType, SurchargeType};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn apartment() -> Apartment {
        Apartment {
            id: Uuid::new_v4(),
            name: "Harbour".to_string(),
            currency: "EUR".to_string(),
            base_price: dec!(100),
            price_type: PriceType::Flat,
            included_guests: 2,
            extra_guest_surcharge: dec!(0),
            surcharge_type: SurchargeType::Fixed,
            max_guests: 4,
            seasonal_windows: vec![],
            ical_import_urls: vec!["https://www.airbnb.com/calendar/ical/1.ics".to_string()],
        }
    }

    fn event(uid: &str, start: NaiveDate, end: NaiveDate, status: EventStatus) -> FeedEvent {
        FeedEvent {
            uid: uid.to_string(),
            start: midnight_utc(start),
            end: midnight_utc(end),
            all_day: true,
            summary: "Reserved".to_string(),
            status,
        }
    }

    #[test]
    fn test_channel_for_url() {
        assert_eq!(channel_for_url("https://www.airbnb.com/calendar/ical/1.ics?s=x"), "www.airbnb.com");
        assert_eq!(channel_for_url("http://user@Booking.com:8080/feed"), "booking.com");
        assert_eq!(channel_for_url(""), "ical");
    }

    #[test]
    fn test_plan_creates_updates_and_cancels() {
        let apt = apartment();
        let now = Utc::now();
        let channel = "www.airbnb.com";

        let kept = new_external_booking(
            &apt,
            channel,
            &event("kept", date(2024, 5, 1), date(2024, 5, 3), EventStatus::Confirmed),
            now,
        );
        let moved = new_external_booking(
            &apt,
            channel,
            &event("moved", date(2024, 5, 10), date(2024, 5, 12), EventStatus::Confirmed),
            now,
        );
        let vanished = new_external_booking(
            &apt,
            channel,
            &event("vanished", date(2024, 6, 1), date(2024, 6, 5), EventStatus::Confirmed),
            now,
        );
        let existing = vec![kept, moved, vanished.clone()];

        let events = vec![
            event("kept", date(2024, 5, 1), date(2024, 5, 3), EventStatus::Confirmed),
            event("moved", date(2024, 5, 11), date(2024, 5, 14), EventStatus::Confirmed),
            event("fresh", date(2024, 7, 1), date(2024, 7, 8), EventStatus::Confirmed),
            event("never-seen", date(2024, 8, 1), date(2024, 8, 2), EventStatus::Cancelled),
            event("cm-booking-123", date(2024, 9, 1), date(2024, 9, 2), EventStatus::Confirmed),
        ];

        let (actions, ignored) = plan_sync(&apt, channel, &events, &existing, now);
        assert_eq!(ignored, 2);
        assert_eq!(actions.len(), 3);

        match &actions[0] {
            SyncAction::Update(b) => {
                assert_eq!(b.source.external_id(), Some("moved"));
                assert_eq!((b.check_in, b.check_out), (date(2024, 5, 11), date(2024, 5, 14)));
            }
            other => panic!("expected update, got {other:?}"),
        }
        match &actions[1] {
            SyncAction::Create(b) => {
                assert_eq!(b.source.external_id(), Some("fresh"));
                assert_eq!(b.status, BookingStatus::Confirmed);
                assert_eq!(b.total_price, Decimal::ZERO);
                assert_eq!(b.notes.as_deref(), Some("iCal: Reserved"));
            }
            other => panic!("expected create, got {other:?}"),
        }
        match &actions[2] {
            SyncAction::Cancel(b) => {
                assert_eq!(b.id, vanished.id);
                assert_eq!(b.status, BookingStatus::Cancelled);
            }
            other => panic!("expected cancel, got {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_in_feed_cancels_existing_once() {
        let apt = apartment();
        let now = Utc::now();
        let live = new_external_booking(
            &apt,
            "x",
            &event("u1", date(2024, 5, 1), date(2024, 5, 3), EventStatus::Confirmed),
            now,
        );
        let events = vec![event("u1", date(2024, 5, 1), date(2024, 5, 3), EventStatus::Cancelled)];

        let (actions, _) = plan_sync(&apt, "x", &events, &[live.clone()], now);
        assert!(matches!(&actions[..], [SyncAction::Cancel(b)] if b.id == live.id));

        // Already cancelled: nothing further to do.
        let already = cancelled(&live, now);
        let (actions, _) = plan_sync(&apt, "x", &events, &[already], now);
        assert!(actions.is_empty());
    }
}
