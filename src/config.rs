use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub conflict_window_minutes: i64,
    pub booking_retry_limit: u32,
    pub status_sweep_interval_secs: u64,
    pub max_concurrent_requests: usize,
    pub notification_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            conflict_window_minutes: env::var("CONFLICT_WINDOW_MINUTES")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .expect("CONFLICT_WINDOW_MINUTES must be a number"),
            booking_retry_limit: env::var("BOOKING_RETRY_LIMIT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("BOOKING_RETRY_LIMIT must be a number"),
            status_sweep_interval_secs: env::var("STATUS_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .expect("STATUS_SWEEP_INTERVAL_SECS must be a number"),
            max_concurrent_requests: env::var("MAX_CONCURRENT_REQUESTS")
                .unwrap_or_else(|_| "256".to_string())
                .parse()
                .expect("MAX_CONCURRENT_REQUESTS must be a number"),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.is_empty()),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
