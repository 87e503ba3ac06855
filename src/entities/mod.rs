pub mod booking;
pub mod chat_message;
pub mod notification;
pub mod payment_transaction;
pub mod ride;
pub mod user;
