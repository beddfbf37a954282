//! Availability resolution across persisted bookings, daily rates and
//! external channel calendars.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::db::{BookingRepository, DailyRateRepository};
use crate::error::Result;
use crate::models::{Apartment, DailyRate};

use super::checker::{is_available, midnight_utc, BusyInterval};
use super::feed::{CalendarFeed, FeedError};
use super::ical::busy_intervals;

/// Why a stay cannot be taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Overlaps a tentative or confirmed booking.
    Booked,
    Blocked { date: NaiveDate },
    MinStay { date: NaiveDate, required: u32 },
    ExternalCalendar { url: String },
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Booked => write!(f, "overlaps an existing booking"),
            Self::Blocked { date } => write!(f, "{date} is blocked"),
            Self::MinStay { date, required } => {
                write!(f, "stays starting {date} require at least {required} nights")
            }
            Self::ExternalCalendar { url } => write!(f, "booked on external calendar {url}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Unavailable,
    /// Local checks passed but at least one external calendar could not be read.
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityReport {
    pub available: bool,
    pub status: AvailabilityStatus,
    pub reason: Option<UnavailableReason>,
    pub feed_errors: Vec<String>,
}

impl AvailabilityReport {
    fn unavailable(reason: UnavailableReason) -> Self {
        Self {
            available: false,
            status: AvailabilityStatus::Unavailable,
            reason: Some(reason),
            feed_errors: Vec::new(),
        }
    }
}

/// Busy intervals from all of an apartment's feeds, fetched fresh.
#[derive(Debug, Default)]
pub struct ExternalCalendars {
    /// Per feed URL, in the apartment's configured order.
    pub busy: Vec<(String, Vec<BusyInterval>)>,
    pub failures: Vec<FeedError>,
}

impl ExternalCalendars {
    /// URL of the first feed with an event overlapping the stay.
    pub fn conflicting_feed(&self, check_in: NaiveDate, check_out: NaiveDate) -> Option<&str> {
        let (start, end) = (midnight_utc(check_in), midnight_utc(check_out));
        self.busy
            .iter()
            .find(|(_, intervals)| !is_available(start, end, intervals))
            .map(|(url, _)| url.as_str())
    }
}

/// Fetch every feed. A failing feed is recorded and does not stop the others.
pub async fn fetch_external_calendars(feed: &dyn CalendarFeed, urls: &[String]) -> ExternalCalendars {
    let mut calendars = ExternalCalendars::default();
    for url in urls {
        match feed.fetch_events(url).await {
            Ok(events) => {
                let foreign: Vec<_> = events
                    .into_iter()
                    .filter(|event| !event.is_exported_by_us())
                    .collect();
                calendars.busy.push((url.clone(), busy_intervals(&foreign)));
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "External calendar unavailable");
                calendars.failures.push(err);
            }
        }
    }
    calendars
}

/// Blocked nights and the check-in night's minimum stay.
pub fn check_stay_rules(
    check_in: NaiveDate,
    nights: u32,
    rates: &[DailyRate],
) -> std::result::Result<(), UnavailableReason> {
    let last_exclusive = check_in
        .checked_add_days(Days::new(u64::from(nights)))
        .unwrap_or(check_in);

    if let Some(blocked) = rates
        .iter()
        .filter(|rate| rate.date >= check_in && rate.date < last_exclusive)
        .find(|rate| rate.is_blocked)
    {
        return Err(UnavailableReason::Blocked { date: blocked.date });
    }

    if let Some(required) = rates
        .iter()
        .find(|rate| rate.date == check_in)
        .and_then(|rate| rate.min_stay)
    {
        if nights < required {
            return Err(UnavailableReason::MinStay {
                date: check_in,
                required,
            });
        }
    }

    Ok(())
}

/// Full availability check for `[check_in, check_out)`.
///
/// A same-day or inverted range is checked as the single night starting at
/// `check_in`. Persisted bookings and daily rates are checked first; external
/// calendars are only fetched when those pass.
pub async fn check_availability<S>(
    store: &S,
    feed: &dyn CalendarFeed,
    apartment: &Apartment,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<AvailabilityReport>
where
    S: BookingRepository + DailyRateRepository + ?Sized,
{
    let nights = u32::try_from((check_out - check_in).num_days().max(1)).unwrap_or(u32::MAX);
    let stay_end = check_in
        .checked_add_days(Days::new(u64::from(nights)))
        .unwrap_or(check_out);

    if store
        .has_overlapping_booking(apartment.id, check_in, stay_end)
        .await?
    {
        return Ok(AvailabilityReport::unavailable(UnavailableReason::Booked));
    }

    let rates = store.list_daily_rates(apartment.id, check_in, stay_end).await?;
    if let Err(reason) = check_stay_rules(check_in, nights, &rates) {
        return Ok(AvailabilityReport::unavailable(reason));
    }

    let external = fetch_external_calendars(feed, &apartment.ical_import_urls).await;
    if let Some(url) = external.conflicting_feed(check_in, stay_end) {
        return Ok(AvailabilityReport::unavailable(UnavailableReason::ExternalCalendar {
            url: url.to_string(),
        }));
    }

    let feed_errors: Vec<String> = external.failures.iter().map(ToString::to_string).collect();
    let status = if feed_errors.is_empty() {
        AvailabilityStatus::Available
    } else {
        AvailabilityStatus::Unknown
    };

    Ok(AvailabilityReport {
        available: status == AvailabilityStatus::Available,
        status,
        reason: None,
        feed_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::ical::FeedEvent;
    use crate::db::{ApartmentRepository, MemoryStore};
    use crate::models::{PriceType, SurchargeType};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    struct QuietFeed;

    #[async_trait]
    impl CalendarFeed for QuietFeed {
        async fn fetch_events(&self, _url: &str) -> std::result::Result<Vec<FeedEvent>, FeedError> {
            Ok(vec![])
        }
    }

    fn apartment() -> Apartment {
        Apartment {
            id: Uuid::new_v4(),
            name: "Harbour".to_string(),
            currency: "EUR".to_string(),
            base_price: Decimal::ONE_HUNDRED,
            price_type: PriceType::Flat,
            included_guests: 2,
            extra_guest_surcharge: Decimal::ZERO,
            surcharge_type: SurchargeType::Fixed,
            max_guests: 4,
            seasonal_windows: vec![],
            ical_import_urls: vec!["https://a.example/cal.ics".to_string()],
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rate(on: NaiveDate, blocked: bool, min_stay: Option<u32>) -> DailyRate {
        DailyRate {
            apartment_id: Uuid::nil(),
            date: on,
            price: None,
            is_blocked: blocked,
            min_stay,
        }
    }

    #[test]
    fn test_blocked_night_inside_stay() {
        let rates = [rate(date(2024, 5, 2), true, None)];
        assert_eq!(
            check_stay_rules(date(2024, 5, 1), 3, &rates),
            Err(UnavailableReason::Blocked { date: date(2024, 5, 2) })
        );
    }

    #[test]
    fn test_blocked_checkout_day_is_not_a_night() {
        let rates = [rate(date(2024, 5, 4), true, None)];
        assert_eq!(check_stay_rules(date(2024, 5, 1), 3, &rates), Ok(()));
    }

    #[test]
    fn test_min_stay_applies_to_check_in_night() {
        let rates = [
            rate(date(2024, 5, 1), false, Some(4)),
            rate(date(2024, 5, 2), false, Some(7)),
        ];
        assert_eq!(
            check_stay_rules(date(2024, 5, 1), 3, &rates),
            Err(UnavailableReason::MinStay {
                date: date(2024, 5, 1),
                required: 4
            })
        );
        assert_eq!(check_stay_rules(date(2024, 5, 1), 4, &rates), Ok(()));
    }

    #[test]
    fn test_conflicting_feed_reports_url() {
        let calendars = ExternalCalendars {
            busy: vec![
                (
                    "https://a.example/cal.ics".to_string(),
                    vec![BusyInterval::from_dates(date(2024, 5, 10), date(2024, 5, 12))],
                ),
                (
                    "https://b.example/cal.ics".to_string(),
                    vec![BusyInterval::from_dates(date(2024, 5, 2), date(2024, 5, 3))],
                ),
            ],
            failures: vec![],
        };
        assert_eq!(
            calendars.conflicting_feed(date(2024, 5, 1), date(2024, 5, 4)),
            Some("https://b.example/cal.ics")
        );
        assert_eq!(calendars.conflicting_feed(date(2024, 5, 3), date(2024, 5, 10)), None);
    }

    #[tokio::test]
    async fn test_same_day_range_checks_the_check_in_night() {
        let apt = apartment();
        let store = MemoryStore::new();
        store.upsert_apartment(&apt).await.unwrap();
        let day = date(2024, 5, 1);
        store
            .upsert_daily_rate(&DailyRate {
                apartment_id: apt.id,
                ..rate(day, true, None)
            })
            .await
            .unwrap();

        let report = check_availability(&store, &QuietFeed, &apt, day, day).await.unwrap();
        assert_eq!(report.status, AvailabilityStatus::Unavailable);
        assert_eq!(report.reason, Some(UnavailableReason::Blocked { date: day }));

        let next = date(2024, 5, 2);
        let report = check_availability(&store, &QuietFeed, &apt, next, next).await.unwrap();
        assert!(report.available);
    }
}
