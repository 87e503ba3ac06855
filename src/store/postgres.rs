use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::{Booking, Coordinates, Driver, Ride, RideStatus};
use crate::entities::{booking, ride};
use crate::store::{RideFilter, RideStore, StoreError};

/// Rides in Postgres: one `ride` row plus ordered `booking` rows.
///
/// Commits run `UPDATE ride ... WHERE id = $1 AND version = $2` and rewrite
/// the ride's bookings in the same transaction. Zero rows updated means
/// someone else committed first.
#[derive(Clone)]
pub struct PgRideStore {
    db: DatabaseConnection,
}

impl PgRideStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn coords(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinates> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
        _ => None,
    }
}

fn to_domain(model: ride::Model, mut bookings: Vec<booking::Model>) -> Result<Ride, StoreError> {
    bookings.sort_by_key(|b| b.position);

    let ride = Ride {
        id: model.id,
        from: model.from_label,
        to: model.to_label,
        from_coords: coords(model.from_lat, model.from_lng),
        to_coords: coords(model.to_lat, model.to_lng),
        distance_km: model.distance_km,
        date: model.departure_date,
        time: model.departure_time,
        seats: model.seats,
        available_seats: model.available_seats,
        price: model.price,
        notes: model.notes,
        driver: Driver {
            user_id: model.driver_user_id,
            name: model.driver_name,
            phone: model.driver_phone,
            rating: model.driver_rating,
        },
        passengers: bookings
            .into_iter()
            .map(|b| Booking {
                id: b.id,
                user_id: b.user_id,
                seats_booked: b.seats_booked,
                booking_date: b.booking_date.with_timezone(&Utc),
                status: b.status,
                payment_status: b.payment_status,
                payment_id: b.payment_id,
            })
            .collect(),
        status: model.status,
        version: model.version,
        created_at: model.created_at.with_timezone(&Utc),
    };

    ride.verify()
        .map_err(|source| StoreError::Corrupt { id: ride.id, source })?;
    Ok(ride)
}

/// Every mutable column of the ride row. Id, version and creation time are left unset.
fn ride_columns(ride: &Ride) -> ride::ActiveModel {
    ride::ActiveModel {
        id: NotSet,
        from_label: Set(ride.from.clone()),
        to_label: Set(ride.to.clone()),
        from_lat: Set(ride.from_coords.map(|c| c.lat)),
        from_lng: Set(ride.from_coords.map(|c| c.lng)),
        to_lat: Set(ride.to_coords.map(|c| c.lat)),
        to_lng: Set(ride.to_coords.map(|c| c.lng)),
        distance_km: Set(ride.distance_km),
        departure_date: Set(ride.date),
        departure_time: Set(ride.time),
        seats: Set(ride.seats),
        available_seats: Set(ride.available_seats),
        price: Set(ride.price),
        notes: Set(ride.notes.clone()),
        driver_user_id: Set(ride.driver.user_id),
        driver_name: Set(ride.driver.name.clone()),
        driver_phone: Set(ride.driver.phone.clone()),
        driver_rating: Set(ride.driver.rating),
        status: Set(ride.status),
        version: NotSet,
        created_at: NotSet,
    }
}

fn booking_rows(ride: &Ride) -> Vec<booking::ActiveModel> {
    ride.passengers
        .iter()
        .enumerate()
        .map(|(position, b)| booking::ActiveModel {
            id: Set(b.id),
            ride_id: Set(ride.id),
            user_id: Set(b.user_id),
            seats_booked: Set(b.seats_booked),
            position: Set(position as i32),
            booking_date: Set(b.booking_date.into()),
            status: Set(b.status),
            payment_status: Set(b.payment_status),
            payment_id: Set(b.payment_id.clone()),
        })
        .collect()
}

#[async_trait]
impl RideStore for PgRideStore {
    async fn insert_ride(&self, ride: &Ride) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        let mut row = ride_columns(ride);
        row.id = Set(ride.id);
        row.version = Set(ride.version);
        row.created_at = Set(ride.created_at.into());
        ride::Entity::insert(row).exec(&txn).await?;

        let bookings = booking_rows(ride);
        if !bookings.is_empty() {
            booking::Entity::insert_many(bookings).exec(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn load_ride(&self, id: Uuid) -> Result<Option<Ride>, StoreError> {
        let found = ride::Entity::find_by_id(id)
            .find_with_related(booking::Entity)
            .all(&self.db)
            .await?;

        match found.into_iter().next() {
            Some((model, bookings)) => to_domain(model, bookings).map(Some),
            None => Ok(None),
        }
    }

    async fn commit_ride(&self, ride: &Ride) -> Result<Ride, StoreError> {
        ride.verify()
            .map_err(|source| StoreError::Corrupt { id: ride.id, source })?;

        let next_version = ride.version + 1;
        let txn = self.db.begin().await?;

        let updated = ride::Entity::update_many()
            .set(ride_columns(ride))
            .col_expr(ride::Column::Version, Expr::value(next_version))
            .filter(ride::Column::Id.eq(ride.id))
            .filter(ride::Column::Version.eq(ride.version))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            // Dropping the transaction rolls it back
            return Err(StoreError::VersionConflict);
        }

        booking::Entity::delete_many()
            .filter(booking::Column::RideId.eq(ride.id))
            .exec(&txn)
            .await?;

        let bookings = booking_rows(ride);
        if !bookings.is_empty() {
            booking::Entity::insert_many(bookings).exec(&txn).await?;
        }

        txn.commit().await?;

        let mut committed = ride.clone();
        committed.version = next_version;
        Ok(committed)
    }

    async fn delete_ride(&self, id: Uuid, expected_version: i32) -> Result<(), StoreError> {
        let result = ride::Entity::delete_many()
            .filter(ride::Column::Id.eq(id))
            .filter(ride::Column::Version.eq(expected_version))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::VersionConflict);
        }
        Ok(())
    }

    async fn list_rides(&self, filter: &RideFilter) -> Result<Vec<Ride>, StoreError> {
        let mut query = ride::Entity::find();

        if let Some(driver_id) = filter.driver_id {
            query = query.filter(ride::Column::DriverUserId.eq(driver_id));
        }

        if let Some(passenger_id) = filter.passenger_id {
            let ride_ids: Vec<Uuid> = booking::Entity::find()
                .filter(booking::Column::UserId.eq(passenger_id))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|b| b.ride_id)
                .collect();

            if ride_ids.is_empty() {
                return Ok(Vec::new());
            }
            query = query.filter(ride::Column::Id.is_in(ride_ids));
        }

        if let Some(date) = filter.date {
            query = query.filter(ride::Column::DepartureDate.eq(date));
        }

        if let Some(min) = filter.min_available {
            query = query.filter(ride::Column::AvailableSeats.gte(min));
        }

        if let Some(statuses) = &filter.statuses {
            query = query.filter(ride::Column::Status.is_in(statuses.iter().copied()));
        }

        let rows = query
            .order_by_asc(ride::Column::DepartureDate)
            .find_with_related(booking::Entity)
            .all(&self.db)
            .await?;

        let mut rides = Vec::with_capacity(rows.len());
        for (model, bookings) in rows {
            let ride = to_domain(model, bookings)?;
            // Label matching is case-insensitive substring search
            if filter.matches(&ride) {
                rides.push(ride);
            }
        }
        Ok(rides)
    }

    async fn complete_past_rides(&self, today: NaiveDate) -> Result<u64, StoreError> {
        let result = ride::Entity::update_many()
            .set(ride::ActiveModel {
                status: Set(RideStatus::Completed),
                ..Default::default()
            })
            .col_expr(ride::Column::Version, Expr::col(ride::Column::Version).add(1))
            .filter(ride::Column::DepartureDate.lt(today))
            .filter(ride::Column::Status.is_in([RideStatus::Active, RideStatus::Full]))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
