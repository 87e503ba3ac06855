use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::lifecycle;
use crate::domain::Ride;
use crate::store::{RideFilter, RideStore, StoreError};

/// Process-local ride store with compare-and-swap commits.
#[derive(Default)]
pub struct InMemoryRideStore {
    rides: RwLock<HashMap<Uuid, Ride>>,
}

impl InMemoryRideStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RideStore for InMemoryRideStore {
    async fn insert_ride(&self, ride: &Ride) -> Result<(), StoreError> {
        let mut rides = self.rides.write().await;
        if rides.contains_key(&ride.id) {
            return Err(StoreError::Duplicate(ride.id));
        }
        rides.insert(ride.id, ride.clone());
        Ok(())
    }

    async fn load_ride(&self, id: Uuid) -> Result<Option<Ride>, StoreError> {
        Ok(self.rides.read().await.get(&id).cloned())
    }

    async fn commit_ride(&self, ride: &Ride) -> Result<Ride, StoreError> {
        ride.verify().map_err(|source| StoreError::Corrupt { id: ride.id, source })?;

        let mut rides = self.rides.write().await;
        let stored = rides.get_mut(&ride.id).ok_or(StoreError::VersionConflict)?;
        if stored.version != ride.version {
            return Err(StoreError::VersionConflict);
        }

        let mut committed = ride.clone();
        committed.version += 1;
        *stored = committed.clone();
        Ok(committed)
    }

    async fn delete_ride(&self, id: Uuid, expected_version: i32) -> Result<(), StoreError> {
        let mut rides = self.rides.write().await;
        match rides.get(&id) {
            Some(stored) if stored.version == expected_version => {
                rides.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::VersionConflict),
        }
    }

    async fn list_rides(&self, filter: &RideFilter) -> Result<Vec<Ride>, StoreError> {
        let rides = self.rides.read().await;
        Ok(rides.values().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn complete_past_rides(&self, today: NaiveDate) -> Result<u64, StoreError> {
        let mut rides = self.rides.write().await;
        let mut changed = 0;
        for ride in rides.values_mut() {
            if lifecycle::complete_if_past(ride, today) {
                ride.version += 1;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
