//! Domain models shared by pricing, availability and booking code

pub mod apartment;
pub mod booking;
pub mod daily_rate;
pub mod invoice;

pub use apartment::{Apartment, PriceConfig, PriceType, SeasonalWindow, SurchargeType};
pub use booking::{Booking, BookingSource, BookingStatus, Guest, PaymentStatus};
pub use daily_rate::DailyRate;
pub use invoice::IssuedInvoiceNumber;
