#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use channel_manager::availability::{CalendarFeed, EventStatus, FeedError, FeedEvent};
use channel_manager::config::Config;
use channel_manager::db::{ApartmentRepository, MemoryStore};
use channel_manager::models::{Apartment, PriceType, SurchargeType};
use channel_manager::routes::build_router;
use channel_manager::AppState;

pub const AIRBNB_URL: &str = "https://www.airbnb.com/calendar/ical/42.ics";
pub const BOOKING_URL: &str = "https://admin.booking.com/hotel/ical/42.ics";

/// Canned calendar feed. URLs without a response fail as unavailable.
#[derive(Default)]
pub struct MockFeed {
    responses: HashMap<String, Vec<FeedEvent>>,
    calls: AtomicUsize,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, url: &str, events: Vec<FeedEvent>) -> Self {
        self.responses.insert(url.to_string(), events);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarFeed for MockFeed {
    async fn fetch_events(&self, url: &str) -> Result<Vec<FeedEvent>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FeedError::Unavailable {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn all_day_event(uid: &str, start: NaiveDate, end: NaiveDate, status: EventStatus) -> FeedEvent {
    FeedEvent {
        uid: uid.to_string(),
        start: start.and_time(NaiveTime::MIN).and_utc(),
        end: end.and_time(NaiveTime::MIN).and_utc(),
        all_day: true,
        summary: "Reserved".to_string(),
        status,
    }
}

/// Base 100 flat, 2 guests included, 20 per extra guest, up to 4 guests.
pub fn harbour_apartment() -> Apartment {
    Apartment {
        id: Uuid::new_v4(),
        name: "Harbour View".to_string(),
        currency: "EUR".to_string(),
        base_price: dec!(100),
        price_type: PriceType::Flat,
        included_guests: 2,
        extra_guest_surcharge: dec!(20),
        surcharge_type: SurchargeType::Fixed,
        max_guests: 4,
        seasonal_windows: vec![],
        ical_import_urls: vec![],
    }
}

pub async fn store_with(apartments: &[Apartment]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for apartment in apartments {
        store.upsert_apartment(apartment).await.unwrap();
    }
    store
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub feed: Arc<MockFeed>,
    pub state: AppState,
}

impl TestApp {
    pub fn new(store: Arc<MemoryStore>, feed: MockFeed, config: Config) -> Self {
        let feed = Arc::new(feed);
        let state = AppState::new(store.clone(), feed.clone(), config);
        Self {
            router: build_router(state.clone()),
            store,
            feed,
            state,
        }
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.raw_request(method, uri, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn raw_request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }
}

pub fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}
