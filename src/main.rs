use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use chrono::Utc;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ride_share_backend::{
    config::Config,
    db,
    domain::ConflictDetector,
    middleware::rate_limit::{create_global_governor, log_request},
    notify::{self, DbNotificationSink, FanOutSink, NotificationSink, Notifier, WebhookSink},
    routes,
    store::PgRideStore,
    AppState, BookingEngine,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ride_share_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    // Connect to database
    let db = db::connect(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Migrations complete");

    let engine = Arc::new(BookingEngine::new(
        Arc::new(PgRideStore::new(db.clone())),
        Notifier::new(notification_sink(&config, &db)),
        ConflictDetector::from_minutes(config.conflict_window_minutes),
        config.booking_retry_limit,
    ));

    spawn_sweeper(
        engine.clone(),
        db.clone(),
        Duration::from_secs(config.status_sweep_interval_secs.max(1)),
    );

    let state = AppState {
        db,
        config: config.clone(),
        engine,
    };

    // Create router with middleware
    let app = routes::create_router(state)
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(create_global_governor())
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests));

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

/// Persist every notification; also push to the webhook when one is configured.
fn notification_sink(config: &Config, db: &DatabaseConnection) -> Arc<dyn NotificationSink> {
    let persisted: Arc<dyn NotificationSink> = Arc::new(DbNotificationSink::new(db.clone()));

    let Some(url) = &config.notification_webhook_url else {
        return persisted;
    };

    match WebhookSink::new(url.clone()) {
        Ok(webhook) => {
            tracing::info!(url = %url, "Notification webhook enabled");
            Arc::new(FanOutSink::new(vec![persisted, Arc::new(webhook)]))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Notification webhook disabled");
            persisted
        }
    }
}

/// Periodic date sweep and cleanup of old read notifications.
fn spawn_sweeper(engine: Arc<BookingEngine>, db: DatabaseConnection, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let now = Utc::now();

            if let Err(e) = engine.sweep_completed(now.date_naive()).await {
                tracing::error!(error = %e, "Ride status sweep failed");
            }

            match notify::db::cleanup_expired(&db, now).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Removed old read notifications"),
                Err(e) => tracing::error!(error = %e, "Notification cleanup failed"),
            }
        }
    });
}
