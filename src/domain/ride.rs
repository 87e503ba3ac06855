use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::lifecycle;
use crate::utils::geo::haversine_distance;

pub use crate::entities::booking::{BookingStatus, PaymentStatus};
pub use crate::entities::ride::RideStatus;

pub const MAX_SEATS: i32 = 8;
pub const MAX_NOTES_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Driver record embedded in a ride. `user_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub rating: f64,
}

/// A passenger's reservation on a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub seats_booked: i32,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
}

impl Booking {
    pub fn confirmed(user_id: Uuid, seats_booked: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            seats_booked,
            booking_date: now,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub from_coords: Option<Coordinates>,
    pub to_coords: Option<Coordinates>,
    pub distance_km: Option<f64>,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub seats: i32,
    pub available_seats: i32,
    pub price: f64,
    pub notes: Option<String>,
    pub driver: Driver,
    pub passengers: Vec<Booking>,
    pub status: RideStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for publishing a new ride.
#[derive(Debug, Clone, Deserialize)]
pub struct RideDraft {
    pub from: String,
    pub to: String,
    pub from_coords: Option<Coordinates>,
    pub to_coords: Option<Coordinates>,
    pub date: NaiveDate,
    pub time: String,
    pub seats: i32,
    pub price: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RideRejection {
    #[error("{0} location is required")]
    EmptyLabel(&'static str),
    #[error("Seats must be between 1 and 8")]
    SeatsOutOfRange,
    #[error("Cannot reduce seats below already-booked count ({booked})")]
    SeatsBelowBooked { booked: i32 },
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Ride date cannot be in the past")]
    PastDate,
    #[error("Time must be in HH:MM format, got '{0}'")]
    BadTime(String),
    #[error("Notes cannot exceed 1000 characters")]
    NotesTooLong,
    #[error("Driver rating must be between 0 and 5")]
    RatingOutOfRange,
    #[error("Ride is {0} and can no longer be modified")]
    RideClosed(RideStatus),
}

/// Broken seat-accounting or ownership rule on a loaded ride.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("available seats {available} do not match {seats} seats minus {booked} booked")]
    SeatMismatch { seats: i32, available: i32, booked: i32 },
    #[error("available seats out of range: {0}")]
    SeatsOutOfRange(i32),
    #[error("passenger {0} appears more than once")]
    DuplicatePassenger(Uuid),
    #[error("driver {0} is listed as a passenger")]
    DriverIsPassenger(Uuid),
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, RideRejection> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| RideRejection::BadTime(raw.to_string()))
}

impl Ride {
    /// Validate a draft and build an unbooked, active ride owned by `driver`.
    pub fn create(
        draft: RideDraft,
        driver: Driver,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self, RideRejection> {
        let from = draft.from.trim().to_string();
        let to = draft.to.trim().to_string();
        if from.is_empty() {
            return Err(RideRejection::EmptyLabel("Origin"));
        }
        if to.is_empty() {
            return Err(RideRejection::EmptyLabel("Destination"));
        }
        if !(1..=MAX_SEATS).contains(&draft.seats) {
            return Err(RideRejection::SeatsOutOfRange);
        }
        if draft.price < 0.0 || draft.price.is_nan() {
            return Err(RideRejection::NegativePrice);
        }
        if draft.date < today {
            return Err(RideRejection::PastDate);
        }
        if draft.notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            return Err(RideRejection::NotesTooLong);
        }
        let time = parse_time(&draft.time)?;

        let mut ride = Self {
            id: Uuid::new_v4(),
            from,
            to,
            from_coords: draft.from_coords,
            to_coords: draft.to_coords,
            distance_km: None,
            date: draft.date,
            time,
            seats: draft.seats,
            available_seats: draft.seats,
            price: draft.price,
            notes: draft.notes,
            driver,
            passengers: Vec::new(),
            status: RideStatus::Active,
            version: 0,
            created_at: now,
        };
        ride.refresh_distance();
        Ok(ride)
    }

    /// Scheduled start as a single instant (UTC).
    pub fn departure(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn route(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }

    pub fn booked_seats(&self) -> i32 {
        self.passengers.iter().map(|p| p.seats_booked).sum()
    }

    pub fn total_earnings(&self) -> f64 {
        self.price * f64::from(self.booked_seats())
    }

    pub fn is_driver(&self, user_id: Uuid) -> bool {
        self.driver.user_id == user_id
    }

    pub fn passenger(&self, user_id: Uuid) -> Option<&Booking> {
        self.passengers.iter().find(|p| p.user_id == user_id)
    }

    pub fn passenger_mut(&mut self, user_id: Uuid) -> Option<&mut Booking> {
        self.passengers.iter_mut().find(|p| p.user_id == user_id)
    }

    /// Driver or current passenger.
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.is_driver(user_id) || self.passenger(user_id).is_some()
    }

    /// Append a booking and take its seats out of the pool.
    ///
    /// Callers must have run the booking validator against this snapshot.
    pub fn add_passenger(&mut self, booking: Booking) {
        self.passengers.push(booking);
        self.recompute_available();
    }

    /// Remove a passenger's booking and return its seats to the pool.
    pub fn remove_passenger(&mut self, user_id: Uuid) -> Option<Booking> {
        let index = self.passengers.iter().position(|p| p.user_id == user_id)?;
        let removed = self.passengers.remove(index);
        self.recompute_available();
        Some(removed)
    }

    pub fn recompute_available(&mut self) {
        self.available_seats = self.seats - self.booked_seats();
        lifecycle::refresh_capacity_status(self);
    }

    pub fn refresh_distance(&mut self) {
        self.distance_km = match (self.from_coords, self.to_coords) {
            (Some(a), Some(b)) => Some(haversine_distance(a.lat, a.lng, b.lat, b.lng)),
            _ => None,
        };
    }

    pub fn verify(&self) -> Result<(), InvariantError> {
        let booked = self.booked_seats();
        if self.available_seats != self.seats - booked {
            return Err(InvariantError::SeatMismatch {
                seats: self.seats,
                available: self.available_seats,
                booked,
            });
        }
        if self.available_seats < 0 || self.available_seats > self.seats {
            return Err(InvariantError::SeatsOutOfRange(self.available_seats));
        }
        for (i, p) in self.passengers.iter().enumerate() {
            if p.user_id == self.driver.user_id {
                return Err(InvariantError::DriverIsPassenger(p.user_id));
            }
            if self.passengers[..i].iter().any(|q| q.user_id == p.user_id) {
                return Err(InvariantError::DuplicatePassenger(p.user_id));
            }
        }
        Ok(())
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn ride_with_seats(seats: i32) -> Ride {
        let today = NaiveDate::from_ymd_opt(2030, 5, 10).unwrap();
        let driver = Driver {
            user_id: Uuid::new_v4(),
            name: "Asha".to_string(),
            phone: "+911234567890".to_string(),
            rating: 4.8,
        };
        let draft = RideDraft {
            from: "Pune".to_string(),
            to: "Mumbai".to_string(),
            from_coords: None,
            to_coords: None,
            date: today,
            time: "09:30".to_string(),
            seats,
            price: 100.0,
            notes: None,
        };
        Ride::create(draft, driver, today, Utc::now()).unwrap()
    }

    #[test]
    fn test_create_starts_unbooked_and_active() {
        let ride = ride_with_seats(4);
        assert_eq!(ride.available_seats, 4);
        assert_eq!(ride.status, RideStatus::Active);
        assert_eq!(ride.version, 0);
        assert!(ride.verify().is_ok());
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let today = NaiveDate::from_ymd_opt(2030, 5, 10).unwrap();
        let driver = ride_with_seats(1).driver;
        let draft = RideDraft {
            from: "Pune".to_string(),
            to: " ".to_string(),
            from_coords: None,
            to_coords: None,
            date: today,
            time: "09:30".to_string(),
            seats: 2,
            price: 10.0,
            notes: None,
        };

        let err = Ride::create(draft.clone(), driver.clone(), today, Utc::now()).unwrap_err();
        assert_eq!(err, RideRejection::EmptyLabel("Destination"));

        let past = RideDraft { to: "Goa".to_string(), date: today.pred_opt().unwrap(), ..draft.clone() };
        assert_eq!(
            Ride::create(past, driver.clone(), today, Utc::now()).unwrap_err(),
            RideRejection::PastDate
        );

        let too_many = RideDraft { to: "Goa".to_string(), seats: 9, ..draft.clone() };
        assert_eq!(
            Ride::create(too_many, driver.clone(), today, Utc::now()).unwrap_err(),
            RideRejection::SeatsOutOfRange
        );

        let bad_time = RideDraft { to: "Goa".to_string(), time: "25:00".to_string(), ..draft };
        assert!(matches!(
            Ride::create(bad_time, driver, today, Utc::now()),
            Err(RideRejection::BadTime(_))
        ));
    }

    #[test]
    fn test_distance_from_coordinates() {
        let mut ride = ride_with_seats(2);
        ride.from_coords = Some(Coordinates { lat: 18.5204, lng: 73.8567 });
        ride.to_coords = Some(Coordinates { lat: 19.0760, lng: 72.8777 });
        ride.refresh_distance();

        let km = ride.distance_km.unwrap();
        // Pune to Mumbai is roughly 120 km as the crow flies
        assert!(km > 100.0 && km < 140.0);
    }

    #[test]
    fn test_add_and_remove_passenger_keeps_accounting() {
        let mut ride = ride_with_seats(3);
        let rider = Uuid::new_v4();

        ride.add_passenger(Booking::confirmed(rider, 2, Utc::now()));
        assert_eq!(ride.available_seats, 1);
        assert!(ride.verify().is_ok());

        let removed = ride.remove_passenger(rider).unwrap();
        assert_eq!(removed.seats_booked, 2);
        assert_eq!(ride.available_seats, 3);
        assert!(ride.remove_passenger(rider).is_none());
    }

    #[test]
    fn test_verify_catches_driver_as_passenger() {
        let mut ride = ride_with_seats(3);
        let driver_id = ride.driver.user_id;
        ride.add_passenger(Booking::confirmed(driver_id, 1, Utc::now()));

        assert_eq!(ride.verify(), Err(InvariantError::DriverIsPassenger(driver_id)));
    }

    #[test]
    fn test_time_serializes_as_hh_mm() {
        let ride = ride_with_seats(1);
        let json = serde_json::to_value(&ride).unwrap();
        assert_eq!(json["time"], "09:30");
        assert_eq!(json["status"], "active");
    }
}
