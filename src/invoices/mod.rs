//! Sequential invoice numbers per settings group and year.

pub mod routes;
pub mod services;

pub use routes::router;
pub use services::issue_invoice_number;
