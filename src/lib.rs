pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notify;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::BookingEngine;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub engine: Arc<BookingEngine>,
}
