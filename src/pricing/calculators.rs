//! Core pricing calculation functions.
//!
//! Pure functions for pricing math - no database access.

use chrono::{Days, NaiveDate};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::models::{PriceConfig, PriceType, SurchargeType};

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Banker's rounding rounds to the nearest even number when the value is exactly
/// halfway between two possibilities. This reduces cumulative rounding bias.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use channel_manager::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));   // rounds to even
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));   // rounds to even
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Charge for `nights` nights at a single price configuration.
///
/// Per-person pricing ignores the included-guest and surcharge fields. Flat
/// pricing adds one surcharge per guest beyond `included_guests`; a percentage
/// surcharge is taken of the unit price for each extra guest separately, never
/// compounded. No validation is done on the inputs.
pub fn calculate_price(config: &PriceConfig, guest_count: u32, nights: u32) -> Decimal {
    let guests = Decimal::from(guest_count);
    let nights = Decimal::from(nights);

    if config.price_type == PriceType::PerPerson {
        return guests * config.unit_price * nights;
    }

    let mut amount = config.unit_price * nights;
    let extra_guests = guest_count.saturating_sub(config.included_guests);
    if extra_guests == 0 {
        return amount;
    }

    match config.surcharge_type {
        SurchargeType::Fixed => {
            amount += Decimal::from(extra_guests) * config.surcharge_amount * nights;
        }
        SurchargeType::Percentage => {
            let per_guest = config.unit_price * (config.surcharge_amount / Decimal::ONE_HUNDRED) * nights;
            for _ in 0..extra_guests {
                amount += per_guest;
            }
        }
    }

    amount
}

/// Whole calendar days between check-in and check-out. May be zero or negative.
pub fn stay_nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// The `nights` occupied dates starting at `check_in`, stepping by calendar day.
pub fn night_dates(check_in: NaiveDate, nights: u32) -> impl Iterator<Item = NaiveDate> {
    (0..nights).filter_map(move |offset| check_in.checked_add_days(Days::new(u64::from(offset))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn flat(unit: Decimal, included: u32, surcharge: Decimal, kind: SurchargeType) -> PriceConfig {
        PriceConfig {
            unit_price: unit,
            price_type: PriceType::Flat,
            included_guests: included,
            surcharge_amount: surcharge,
            surcharge_type: kind,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ==================== round_money tests ====================

    #[test]
    fn test_round_money_bankers_rounding_to_even() {
        assert_eq!(round_money(dec!(2.5), 0), dec!(2));
        assert_eq!(round_money(dec!(3.5), 0), dec!(4));
        assert_eq!(round_money(dec!(4.5), 0), dec!(4));
        assert_eq!(round_money(dec!(5.5), 0), dec!(6));
    }

    #[test]
    fn test_round_money_decimal_places() {
        assert_eq!(round_money(dec!(2.25), 1), dec!(2.2));
        assert_eq!(round_money(dec!(2.35), 1), dec!(2.4));
        assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
        assert_eq!(round_money(dec!(1.236), 2), dec!(1.24));
    }

    #[test]
    fn test_round_money_negative() {
        assert_eq!(round_money(dec!(-2.5), 0), dec!(-2));
        assert_eq!(round_money(dec!(-1.234), 2), dec!(-1.23));
    }

    // ==================== calculate_price tests ====================

    #[test]
    fn test_per_person_ignores_surcharge_fields() {
        let config = PriceConfig {
            unit_price: dec!(35),
            price_type: PriceType::PerPerson,
            included_guests: 2,
            surcharge_amount: dec!(999),
            surcharge_type: SurchargeType::Fixed,
        };
        assert_eq!(calculate_price(&config, 3, 4), dec!(420)); // 3 * 35 * 4
        assert_eq!(calculate_price(&config, 1, 1), dec!(35));
    }

    #[test]
    fn test_flat_within_included_guests() {
        let fixed = flat(dec!(100), 2, dec!(20), SurchargeType::Fixed);
        let pct = flat(dec!(100), 2, dec!(50), SurchargeType::Percentage);
        assert_eq!(calculate_price(&fixed, 2, 3), dec!(300));
        assert_eq!(calculate_price(&fixed, 1, 3), dec!(300));
        assert_eq!(calculate_price(&pct, 2, 3), dec!(300));
    }

    #[test]
    fn test_flat_fixed_surcharge() {
        let config = flat(dec!(100), 2, dec!(20), SurchargeType::Fixed);
        // 100*3 + 2*20*3
        assert_eq!(calculate_price(&config, 4, 3), dec!(420));
        assert_eq!(calculate_price(&config, 3, 1), dec!(120));
    }

    #[test]
    fn test_flat_percentage_surcharge_is_additive_per_guest() {
        let config = flat(dec!(100), 2, dec!(10), SurchargeType::Percentage);
        // each extra guest adds 10% of the base: 100 + 10 + 10
        assert_eq!(calculate_price(&config, 4, 1), dec!(120));
        assert_eq!(calculate_price(&config, 4, 2), dec!(240));
    }

    #[test]
    fn test_flat_percentage_fractional() {
        let config = flat(dec!(89.90), 1, dec!(12.5), SurchargeType::Percentage);
        assert_eq!(calculate_price(&config, 2, 1), dec!(101.1375));
        assert_eq!(round_money(calculate_price(&config, 2, 1), 2), dec!(101.14));
    }

    #[test]
    fn test_zero_included_guests_charges_everyone_extra() {
        let config = flat(dec!(50), 0, dec!(5), SurchargeType::Fixed);
        assert_eq!(calculate_price(&config, 2, 1), dec!(60));
    }

    // ==================== night helpers ====================

    #[test]
    fn test_stay_nights() {
        assert_eq!(stay_nights(date(2024, 5, 1), date(2024, 5, 4)), 3);
        assert_eq!(stay_nights(date(2024, 5, 1), date(2024, 5, 1)), 0);
        assert_eq!(stay_nights(date(2024, 5, 4), date(2024, 5, 1)), -3);
    }

    #[test]
    fn test_night_dates_cross_dst_and_month_end() {
        // Last Sunday of March is a DST switch in Europe; calendar days are unaffected.
        let nights: Vec<_> = night_dates(date(2024, 3, 30), 3).collect();
        assert_eq!(nights, vec![date(2024, 3, 30), date(2024, 3, 31), date(2024, 4, 1)]);
        assert_eq!(night_dates(date(2024, 3, 30), 0).count(), 0);
    }
}
