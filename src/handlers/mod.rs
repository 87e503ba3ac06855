pub mod auth;
pub mod bookings;
pub mod chat;
pub mod notifications;
pub mod payments;
pub mod rides;
