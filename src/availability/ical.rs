//! iCalendar (RFC 5545) reading and writing for channel calendars.
//!
//! Only the subset channel managers exchange is handled: VEVENT blocks with
//! UID, DTSTART, DTEND, SUMMARY and STATUS.

use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};
use sha1::{Digest, Sha1};

use crate::models::{Booking, DailyRate};

use super::checker::{midnight_utc, BusyInterval};

/// UID prefix on events we export. Imported events carrying it are our own
/// bookings echoed back by a channel and are skipped.
pub const EXPORT_UID_PREFIX: &str = "cm-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

/// One VEVENT from a remote feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub uid: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub summary: String,
    pub status: EventStatus,
}

impl FeedEvent {
    pub fn busy_interval(&self) -> BusyInterval {
        BusyInterval::new(self.start, self.end)
    }

    /// Check-in date in UTC.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Check-out date in UTC, at least one day after the start date.
    pub fn end_date(&self) -> NaiveDate {
        let start = self.start_date();
        let end = self.end.date_naive();
        if end > start {
            end
        } else {
            start.checked_add_days(Days::new(1)).unwrap_or(start)
        }
    }

    pub fn is_exported_by_us(&self) -> bool {
        self.uid.trim().to_lowercase().starts_with(EXPORT_UID_PREFIX)
    }
}

/// Busy intervals from events that still hold nights.
pub fn busy_intervals(events: &[FeedEvent]) -> Vec<BusyInterval> {
    events
        .iter()
        .filter(|event| event.status != EventStatus::Cancelled)
        .map(FeedEvent::busy_interval)
        .collect()
}

fn unfold_lines(text: &str) -> Vec<String> {
    let mut unfolded: Vec<String> = Vec::new();
    for raw in text.lines() {
        let line = raw.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if let Some(last) = unfolded.last_mut() {
                last.push_str(&line[1..]);
                continue;
            }
        }
        unfolded.push(line.to_string());
    }
    unfolded
}

/// Property value plus whether it was declared `VALUE=DATE`.
struct Property {
    value: String,
    date_only: bool,
}

/// DATE (`20240501`) or DATE-TIME (`20240501T140000Z`) as a UTC instant.
/// Floating and TZID-qualified times are read as UTC.
fn parse_ical_instant(raw: &str) -> Option<(DateTime<Utc>, bool)> {
    let value = raw.trim().trim_end_matches('Z');
    if value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        return Some((midnight_utc(date), true));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
    Some((naive.and_utc(), false))
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn synthetic_uid(start: DateTime<Utc>, end: DateTime<Utc>, summary: &str) -> String {
    let stable = format!("{}|{}|{}", start.to_rfc3339(), end.to_rfc3339(), summary);
    let mut hasher = Sha1::new();
    hasher.update(stable.as_bytes());
    format!("ical-{:x}", hasher.finalize())
}

fn build_event(props: &HashMap<String, Property>) -> Option<FeedEvent> {
    let dtstart = props.get("DTSTART")?;
    let (start, start_is_date) = parse_ical_instant(&dtstart.value)?;
    let all_day = start_is_date || dtstart.date_only;

    let end = match props.get("DTEND") {
        Some(dtend) => parse_ical_instant(&dtend.value)?.0,
        None if all_day => start.checked_add_days(Days::new(1))?,
        None => return None,
    };
    if end <= start {
        return None;
    }

    let summary = props
        .get("SUMMARY")
        .map(|p| unescape_text(p.value.trim()))
        .unwrap_or_default();
    let status = match props
        .get("STATUS")
        .map(|p| p.value.trim().to_uppercase())
        .as_deref()
    {
        Some("CANCELLED") => EventStatus::Cancelled,
        Some("TENTATIVE") => EventStatus::Tentative,
        _ => EventStatus::Confirmed,
    };
    let uid = props
        .get("UID")
        .map(|p| p.value.trim().to_string())
        .filter(|uid| !uid.is_empty())
        .unwrap_or_else(|| synthetic_uid(start, end, &summary));

    Some(FeedEvent {
        uid,
        start,
        end,
        all_day,
        summary,
        status,
    })
}

/// Parse every well-formed VEVENT in `text`. Events without a usable start,
/// or ending at or before their start, are skipped.
pub fn parse_calendar(text: &str) -> Vec<FeedEvent> {
    let mut events = Vec::new();
    let mut current: Option<HashMap<String, Property>> = None;

    for line in unfold_lines(text) {
        let upper = line.trim().to_uppercase();
        if upper == "BEGIN:VEVENT" {
            current = Some(HashMap::new());
            continue;
        }
        if upper == "END:VEVENT" {
            if let Some(props) = current.take() {
                match build_event(&props) {
                    Some(event) => events.push(event),
                    None => tracing::debug!("Skipping malformed VEVENT"),
                }
            }
            continue;
        }
        let Some(props) = current.as_mut() else {
            continue;
        };
        let Some((key_part, value)) = line.split_once(':') else {
            continue;
        };

        let mut key_bits = key_part.split(';');
        let name = key_bits.next().unwrap_or_default().trim().to_uppercase();
        if name.is_empty() {
            continue;
        }
        let date_only = key_bits.any(|param| param.trim().eq_ignore_ascii_case("VALUE=DATE"));

        // First occurrence of a property wins.
        props.entry(name).or_insert(Property {
            value: value.to_string(),
            date_only,
        });
    }

    events
}

// ==================== export ====================

fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\\n")
}

/// Split a content line into 75-octet chunks without breaking UTF-8 sequences.
fn fold_line(line: &str, limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for c in line.chars() {
        let budget = if out.is_empty() { limit } else { limit - 1 };
        if current.len() + c.len_utf8() > budget {
            out.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    out.push(current);

    out.into_iter()
        .enumerate()
        .map(|(i, chunk)| if i == 0 { chunk } else { format!(" {chunk}") })
        .collect()
}

fn push_all_day_event(
    lines: &mut Vec<String>,
    stamp: &str,
    uid: &str,
    start: NaiveDate,
    end: NaiveDate,
    summary: &str,
) {
    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:{uid}"));
    lines.push(format!("DTSTAMP:{stamp}"));
    lines.push(format!("DTSTART;VALUE=DATE:{}", start.format("%Y%m%d")));
    lines.push(format!("DTEND;VALUE=DATE:{}", end.format("%Y%m%d")));
    lines.push(format!("SUMMARY:{}", escape_text(summary)));
    lines.push("END:VEVENT".to_string());
}

/// Render live bookings and blocked days as an iCalendar document.
///
/// Cancelled/completed bookings and unblocked rates are left out. Guest
/// details are never exported.
pub fn export_calendar(
    calendar_name: &str,
    bookings: &[Booking],
    rates: &[DailyRate],
    now: DateTime<Utc>,
) -> String {
    let stamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Channel Manager//iCal Export//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:{}", escape_text(calendar_name)),
    ];

    for booking in bookings.iter().filter(|b| b.status.occupies_calendar()) {
        push_all_day_event(
            &mut lines,
            &stamp,
            &format!("{EXPORT_UID_PREFIX}booking-{}", booking.id),
            booking.check_in,
            booking.check_out,
            "Reserved",
        );
    }

    for rate in rates.iter().filter(|r| r.is_blocked) {
        let Some(next_day) = rate.date.checked_add_days(Days::new(1)) else {
            continue;
        };
        push_all_day_event(
            &mut lines,
            &stamp,
            &format!("{EXPORT_UID_PREFIX}block-{}-{}", rate.apartment_id, rate.date.format("%Y%m%d")),
            rate.date,
            next_day,
            "Blocked",
        );
    }

    lines.push("END:VCALENDAR".to_string());

    let folded: Vec<String> = lines.iter().flat_map(|line| fold_line(line, 75)).collect();
    format!("{}\r\n", folded.join("\r\n"))
}
