//! Direct bookings: validation, authoritative pricing and atomic persistence.

pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;

pub use routes::router;
pub use services::{cancel_booking, create_booking, BookingError, NewBooking};
