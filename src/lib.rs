//! Channel manager backend: stay pricing, availability across external
//! calendars, direct bookings and invoice numbering.

pub mod apartments;
pub mod availability;
pub mod bookings;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod invoices;
pub mod models;
pub mod pricing;
pub mod routes;

use std::sync::Arc;

use crate::availability::CalendarFeed;
use crate::cache::AppCache;
use crate::config::Config;
use crate::db::Store;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub feed: Arc<dyn CalendarFeed>,
    pub cache: AppCache,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, feed: Arc<dyn CalendarFeed>, config: Config) -> Self {
        Self {
            store,
            feed,
            cache: AppCache::new(config.apartment_cache_ttl),
            config: Arc::new(config),
        }
    }
}
