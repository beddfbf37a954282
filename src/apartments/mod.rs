//! Apartment pricing configuration and daily-rate management.

pub mod requests;
pub mod routes;

pub use routes::router;
