use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Driver, Ride, RideDraft, RidePatch, RideStatus};
use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::services::booking::{DriverRide, RideSearch};
use crate::services::ledger;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RideStatus,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Search open rides, cheapest first
pub async fn search_rides(
    State(state): State<AppState>,
    Query(search): Query<RideSearch>,
) -> AppResult<Json<Vec<Ride>>> {
    let rides = state.engine.search_rides(search).await?;
    Ok(Json(rides))
}

/// Get ride details
pub async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<Ride>> {
    let ride = state.engine.get_ride(ride_id).await?;
    Ok(Json(ride))
}

/// Publish a ride. The driver record comes from the caller's account.
pub async fn create_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<RideDraft>,
) -> AppResult<(StatusCode, Json<Ride>)> {
    let account = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    let driver = Driver {
        user_id: account.id,
        name: account.name,
        phone: account.phone.unwrap_or_default(),
        rating: account.rating,
    };

    let ride = state.engine.create_ride(driver, draft).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

/// Driver edit
pub async fn update_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
    Json(patch): Json<RidePatch>,
) -> AppResult<Json<Ride>> {
    let ride = state.engine.edit_ride(ride_id, claims.sub, patch).await?;
    Ok(Json(ride))
}

/// Delete an unbooked ride
pub async fn delete_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.engine.delete_ride(ride_id, claims.sub).await?;
    Ok(Json(MessageResponse {
        message: "Ride deleted".to_string(),
    }))
}

/// Start, complete or cancel a ride
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Ride>> {
    let ride = state
        .engine
        .set_ride_status(ride_id, claims.sub, payload.status)
        .await?;

    if ride.status == RideStatus::Cancelled {
        if let Err(e) = ledger::mark_refunded(&state.db, ride.id, None, Utc::now()).await {
            tracing::warn!(error = %e, ride_id = %ride.id, "Refunds not recorded in the ledger");
        }
    }
    Ok(Json(ride))
}

/// Rides the caller drives, with booked seats and earnings
pub async fn my_rides(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<DriverRide>>> {
    let rides = state.engine.driver_rides(claims.sub).await?;
    Ok(Json(rides))
}
