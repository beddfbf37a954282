//! Stay pricing engine.
//!
//! Pure calculators and the per-night resolver do the arithmetic; the
//! services load apartments (through the cache) and daily rates from the
//! store and aggregate nights into a stay total.

pub mod calculators;
pub mod requests;
pub mod resolver;
pub mod responses;
pub mod routes;
pub mod services;

// Re-export commonly used items
pub use calculators::{calculate_price, round_money};
pub use resolver::{resolve_night, resolve_nightly_price, NightlyPrice, PriceSource};
pub use routes::router;
pub use services::{quote_stay, total_stay_price, PricingError, StayQuote};
