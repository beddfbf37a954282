mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use channel_manager::cache::AppCache;
use channel_manager::config::StayRangePolicy;
use channel_manager::db::{ApartmentRepository, DailyRateRepository};
use channel_manager::models::{DailyRate, SeasonalWindow, SurchargeType};
use channel_manager::pricing::{quote_stay, resolve_nightly_price, total_stay_price, PriceSource, PricingError};

use common::{date, harbour_apartment, store_with};

fn override_rate(apartment_id: Uuid, on: chrono::NaiveDate, price: Decimal) -> DailyRate {
    DailyRate {
        apartment_id,
        date: on,
        price: Some(price),
        is_blocked: false,
        min_stay: None,
    }
}

#[tokio::test]
async fn test_three_nights_four_guests_costs_420() {
    let apartment = harbour_apartment();
    let store = store_with(&[apartment.clone()]).await;
    let cache = AppCache::default();

    let total = total_stay_price(
        store.as_ref(),
        &cache,
        apartment.id,
        date(2024, 5, 1),
        date(2024, 5, 4),
        4,
        StayRangePolicy::Reject,
    )
    .await
    .unwrap();

    assert_eq!(total, dec!(420));
}

#[tokio::test]
async fn test_daily_override_night_plus_two_base_nights() {
    let apartment = harbour_apartment();
    let store = store_with(&[apartment.clone()]).await;
    store
        .upsert_daily_rate(&override_rate(apartment.id, date(2024, 5, 2), dec!(150)))
        .await
        .unwrap();
    let cache = AppCache::default();

    let quote = quote_stay(
        store.as_ref(),
        &cache,
        apartment.id,
        date(2024, 5, 1),
        date(2024, 5, 4),
        4,
        StayRangePolicy::Reject,
    )
    .await
    .unwrap();

    let override_night = resolve_nightly_price(
        &apartment,
        date(2024, 5, 2),
        Some(&override_rate(apartment.id, date(2024, 5, 2), dec!(150))),
        4,
    );
    assert_eq!(override_night, dec!(190));
    assert_eq!(quote.total, override_night + dec!(2) * dec!(140));
    assert_eq!(quote.total, dec!(470));
    assert_eq!(quote.nights[1].source, PriceSource::DailyRate);
    assert_eq!(quote.nights[0].source, PriceSource::Base);
}

#[tokio::test]
async fn test_total_is_sum_of_mixed_nights() {
    let mut apartment = harbour_apartment();
    apartment.surcharge_type = SurchargeType::Percentage;
    apartment.extra_guest_surcharge = dec!(10);
    apartment.seasonal_windows = vec![SeasonalWindow {
        name: "Spring".to_string(),
        start_date: date(2024, 5, 3),
        end_date: date(2024, 5, 5),
        price: dec!(120),
    }];
    let store = store_with(&[apartment.clone()]).await;
    // Override inside the season beats it.
    store
        .upsert_daily_rate(&override_rate(apartment.id, date(2024, 5, 4), dec!(200)))
        .await
        .unwrap();
    // Blocked marker without a price is not a price source.
    store
        .upsert_daily_rate(&DailyRate {
            apartment_id: apartment.id,
            date: date(2024, 5, 6),
            price: None,
            is_blocked: true,
            min_stay: None,
        })
        .await
        .unwrap();
    let cache = AppCache::default();

    let (check_in, check_out) = (date(2024, 5, 1), date(2024, 5, 8));
    let quote = quote_stay(store.as_ref(), &cache, apartment.id, check_in, check_out, 3, StayRangePolicy::Reject)
        .await
        .unwrap();

    let mut sum = Decimal::ZERO;
    for night in &quote.nights {
        let rate = store.find_daily_rate(apartment.id, night.date).await.unwrap();
        sum += resolve_nightly_price(&apartment, night.date, rate.as_ref(), 3);
    }
    assert_eq!(quote.night_count(), 7);
    assert_eq!(quote.total, sum);

    let amounts: Vec<Decimal> = quote.nights.iter().map(|n| n.amount).collect();
    assert_eq!(
        amounts,
        vec![
            dec!(110),
            dec!(110),
            dec!(132),
            dec!(220),
            dec!(132),
            dec!(110),
            dec!(110)
        ]
    );
    assert_eq!(
        quote.nights[2].source,
        PriceSource::Season {
            name: "Spring".to_string()
        }
    );
}

#[tokio::test]
async fn test_unknown_apartment_is_not_found() {
    let store = store_with(&[]).await;
    let cache = AppCache::default();

    let result = total_stay_price(
        store.as_ref(),
        &cache,
        Uuid::new_v4(),
        date(2024, 5, 1),
        date(2024, 5, 2),
        2,
        StayRangePolicy::Reject,
    )
    .await;

    assert!(matches!(result, Err(PricingError::ApartmentNotFound(_))));
}

#[tokio::test]
async fn test_degenerate_range_follows_policy() {
    let apartment = harbour_apartment();
    let store = store_with(&[apartment.clone()]).await;
    let cache = AppCache::default();
    let day = date(2024, 5, 1);

    let rejected =
        total_stay_price(store.as_ref(), &cache, apartment.id, day, day, 2, StayRangePolicy::Reject).await;
    assert!(matches!(rejected, Err(PricingError::InvalidRange { .. })));

    let clamped = total_stay_price(
        store.as_ref(),
        &cache,
        apartment.id,
        day,
        date(2024, 4, 28),
        2,
        StayRangePolicy::Clamp,
    )
    .await
    .unwrap();
    assert_eq!(clamped, dec!(100));
}

#[tokio::test]
async fn test_apartment_cached_until_invalidated() {
    let apartment = harbour_apartment();
    let store = store_with(&[apartment.clone()]).await;
    let cache = AppCache::default();
    let (check_in, check_out) = (date(2024, 5, 1), date(2024, 5, 2));

    let first = total_stay_price(store.as_ref(), &cache, apartment.id, check_in, check_out, 2, StayRangePolicy::Reject)
        .await
        .unwrap();
    assert_eq!(first, dec!(100));

    let mut repriced = apartment.clone();
    repriced.base_price = dec!(130);
    store.upsert_apartment(&repriced).await.unwrap();

    let stale = total_stay_price(store.as_ref(), &cache, apartment.id, check_in, check_out, 2, StayRangePolicy::Reject)
        .await
        .unwrap();
    assert_eq!(stale, dec!(100));

    cache.invalidate_apartment(apartment.id).await;
    let fresh = total_stay_price(store.as_ref(), &cache, apartment.id, check_in, check_out, 2, StayRangePolicy::Reject)
        .await
        .unwrap();
    assert_eq!(fresh, dec!(130));
}
