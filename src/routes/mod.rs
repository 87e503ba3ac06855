use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{auth, bookings, chat, notifications, payments, rides};
use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::user_rate_limit::create_user_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // IP-based governor for unauthenticated routes
    let public_governor = create_public_governor();
    // Per-user governor, keyed on the JWT subject
    let user_governor = create_user_governor();

    let auth_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .layer(public_governor.clone());

    // Browsing rides needs no account
    let public_routes = Router::new()
        .route("/api/rides/search", get(rides::search_rides))
        .route("/api/rides/{id}", get(rides::get_ride))
        .layer(public_governor);

    let protected_routes = Router::new()
        // Ride management (driver)
        .route("/api/rides", post(rides::create_ride))
        .route("/api/rides/mine", get(rides::my_rides))
        .route(
            "/api/rides/{id}",
            put(rides::update_ride).delete(rides::delete_ride),
        )
        .route("/api/rides/{id}/status", put(rides::update_status))
        // Booking (passenger)
        .route("/api/rides/{id}/book", post(bookings::book_ride))
        .route("/api/rides/{id}/cancel", post(bookings::cancel_booking))
        .route("/api/bookings", get(bookings::my_bookings))
        // Payments
        .route("/api/payments/confirm", post(payments::confirm_payment))
        .route("/api/payments/history", get(payments::payment_history))
        .route("/api/payments/transactions/{id}", get(payments::get_transaction))
        // Chat
        .route("/api/chat/conversations", get(chat::list_conversations))
        .route(
            "/api/rides/{id}/chat",
            get(chat::list_messages).post(chat::post_message),
        )
        // Notifications
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/unread-count", get(notifications::unread_count))
        .route("/api/notifications/read-all", put(notifications::mark_all_read))
        .route("/api/notifications/{id}/read", put(notifications::mark_read))
        .route("/api/notifications/{id}", delete(notifications::delete_notification))
        .layer(user_governor)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(auth_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
