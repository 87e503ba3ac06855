pub mod booking;
pub mod ledger;

pub use booking::{BookingEngine, BookingError, RideError};
