//! In-memory caching using moka
//!
//! Apartments are read on every quote and booking but change rarely, so they
//! are cached with a short TTL. Calendar feeds are never cached.

use moka::future::Cache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::models::Apartment;

/// Application cache holding apartment pricing configuration
#[derive(Clone)]
pub struct AppCache {
    /// Apartments (id -> Apartment)
    pub apartments: Cache<Uuid, Arc<Apartment>>,
}

impl AppCache {
    /// Create a new cache instance with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            apartments: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            apartments_size: self.apartments.entry_count(),
        }
    }

    /// Invalidate a specific apartment
    pub async fn invalidate_apartment(&self, id: Uuid) {
        self.apartments.invalidate(&id).await;
        info!(apartment_id = %id, "Cache invalidated for apartment");
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub apartments_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PriceType, SurchargeType};
    use rust_decimal::Decimal;

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
            ical_import_urls: vec![],
        }
    }

    #[tokio::test]
    async fn test_invalidate_apartment_drops_only_that_entry() {
        let cache = AppCache::default();
        let (a, b) = (apartment(), apartment());
        cache.apartments.insert(a.id, Arc::new(a.clone())).await;
        cache.apartments.insert(b.id, Arc::new(b.clone())).await;

        cache.invalidate_apartment(a.id).await;

        assert!(cache.apartments.get(&a.id).await.is_none());
        assert!(cache.apartments.get(&b.id).await.is_some());
    }
}
