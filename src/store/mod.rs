//! Ride persistence.
//!
//! Every write goes through [`RideStore::commit_ride`], which only succeeds
//! when the stored version still matches the snapshot the caller validated.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::ride::InvariantError;
use crate::domain::{Ride, RideStatus};

pub use memory::InMemoryRideStore;
pub use postgres::PgRideStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ride version changed since it was loaded")]
    VersionConflict,
    #[error("ride {0} already exists")]
    Duplicate(Uuid),
    #[error("stored ride {id} is corrupt: {source}")]
    Corrupt {
        id: Uuid,
        #[source]
        source: InvariantError,
    },
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

/// Query over rides. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RideFilter {
    pub driver_id: Option<Uuid>,
    pub passenger_id: Option<Uuid>,
    /// Case-insensitive substring of the origin label
    pub from: Option<String>,
    /// Case-insensitive substring of the destination label
    pub to: Option<String>,
    pub date: Option<NaiveDate>,
    pub min_available: Option<i32>,
    pub statuses: Option<Vec<RideStatus>>,
}

impl RideFilter {
    pub fn driven_by(user_id: Uuid) -> Self {
        Self {
            driver_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn booked_by(user_id: Uuid) -> Self {
        Self {
            passenger_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, ride: &Ride) -> bool {
        if self.driver_id.is_some_and(|id| ride.driver.user_id != id) {
            return false;
        }
        if self.passenger_id.is_some_and(|id| ride.passenger(id).is_none()) {
            return false;
        }
        if let Some(from) = &self.from {
            if !contains_ignore_case(&ride.from, from) {
                return false;
            }
        }
        if let Some(to) = &self.to {
            if !contains_ignore_case(&ride.to, to) {
                return false;
            }
        }
        if self.date.is_some_and(|d| ride.date != d) {
            return false;
        }
        if self.min_available.is_some_and(|n| ride.available_seats < n) {
            return false;
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&ride.status) {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

#[async_trait]
pub trait RideStore: Send + Sync {
    async fn insert_ride(&self, ride: &Ride) -> Result<(), StoreError>;

    async fn load_ride(&self, id: Uuid) -> Result<Option<Ride>, StoreError>;

    /// Persist `ride` (including its passenger list) if the stored version
    /// equals `ride.version`. Returns the ride with its new version.
    async fn commit_ride(&self, ride: &Ride) -> Result<Ride, StoreError>;

    /// Delete a ride if the stored version equals `expected_version`.
    async fn delete_ride(&self, id: Uuid, expected_version: i32) -> Result<(), StoreError>;

    async fn list_rides(&self, filter: &RideFilter) -> Result<Vec<Ride>, StoreError>;

    /// Mark every active or full ride dated before `today` as completed.
    async fn complete_past_rides(&self, today: NaiveDate) -> Result<u64, StoreError>;
}
