use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::booking::{BookedRides, BookedRidesQuery, BookingOutcome, CancellationOutcome};
use crate::services::ledger;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BookRideRequest {
    pub seats_booked: i32,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Book seats on a ride
pub async fn book_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<BookRideRequest>,
) -> AppResult<(StatusCode, Json<BookingOutcome>)> {
    let outcome = state
        .engine
        .book_ride(ride_id, claims.sub, payload.seats_booked)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Cancel the caller's booking on a ride
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<CancelBookingRequest>,
) -> AppResult<Json<CancellationOutcome>> {
    let outcome = state
        .engine
        .cancel_booking(ride_id, claims.sub, payload.reason)
        .await?;

    if outcome.refund_amount > 0.0 {
        let refunded =
            ledger::mark_refunded(&state.db, ride_id, Some(claims.sub), Utc::now()).await;
        if let Err(e) = refunded {
            tracing::warn!(error = %e, ride_id = %ride_id, "Refund not recorded in the ledger");
        }
    }
    Ok(Json(outcome))
}

/// Rides the caller has booked, with a summary
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<BookedRidesQuery>,
) -> AppResult<Json<BookedRides>> {
    let booked = state.engine.get_user_booked_rides(claims.sub, query).await?;
    Ok(Json(booked))
}
