use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::lifecycle;
use crate::domain::ride::{parse_time, Coordinates, Ride, RideRejection, MAX_NOTES_LEN, MAX_SEATS};

/// Editable fields of the embedded driver record.
///
/// Carries no `user_id`; a ride's owner never changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RidePatch {
    pub from: Option<String>,
    pub to: Option<String>,
    pub from_coords: Option<Coordinates>,
    pub to_coords: Option<Coordinates>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub seats: Option<i32>,
    pub price: Option<f64>,
    pub notes: Option<String>,
    pub driver: Option<DriverPatch>,
}

/// Apply a driver edit. Either every field applies or the ride is untouched.
pub fn apply_patch(ride: &mut Ride, patch: RidePatch, today: NaiveDate) -> Result<(), RideRejection> {
    if lifecycle::is_terminal(ride.status) {
        return Err(RideRejection::RideClosed(ride.status));
    }

    let mut next = ride.clone();

    if let Some(from) = patch.from {
        let from = from.trim().to_string();
        if from.is_empty() {
            return Err(RideRejection::EmptyLabel("Origin"));
        }
        next.from = from;
    }

    if let Some(to) = patch.to {
        let to = to.trim().to_string();
        if to.is_empty() {
            return Err(RideRejection::EmptyLabel("Destination"));
        }
        next.to = to;
    }

    if patch.from_coords.is_some() || patch.to_coords.is_some() {
        next.from_coords = patch.from_coords.or(next.from_coords);
        next.to_coords = patch.to_coords.or(next.to_coords);
        next.refresh_distance();
    }

    if let Some(date) = patch.date {
        if date < today {
            return Err(RideRejection::PastDate);
        }
        next.date = date;
    }

    if let Some(time) = patch.time {
        next.time = parse_time(&time)?;
    }

    if let Some(price) = patch.price {
        if price < 0.0 || price.is_nan() {
            return Err(RideRejection::NegativePrice);
        }
        next.price = price;
    }

    if let Some(notes) = patch.notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(RideRejection::NotesTooLong);
        }
        next.notes = Some(notes);
    }

    if let Some(seats) = patch.seats {
        if !(1..=MAX_SEATS).contains(&seats) {
            return Err(RideRejection::SeatsOutOfRange);
        }
        let booked = next.booked_seats();
        if seats - booked < 0 {
            return Err(RideRejection::SeatsBelowBooked { booked });
        }
        next.seats = seats;
        next.recompute_available();
    }

    if let Some(driver) = patch.driver {
        if let Some(name) = driver.name {
            next.driver.name = name;
        }
        if let Some(phone) = driver.phone {
            next.driver.phone = phone;
        }
        if let Some(rating) = driver.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(RideRejection::RatingOutOfRange);
            }
            next.driver.rating = rating;
        }
    }

    *ride = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ride::tests::ride_with_seats;
    use crate::domain::ride::{Booking, RideStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn booked(seats: i32, booked: i32) -> Ride {
        let mut ride = ride_with_seats(seats);
        ride.add_passenger(Booking::confirmed(Uuid::new_v4(), booked, Utc::now()));
        ride
    }

    #[test]
    fn test_cannot_reduce_below_booked() {
        let mut ride = booked(4, 3);
        let today = ride.date;
        let before = ride.clone();

        let patch = RidePatch { seats: Some(2), ..Default::default() };
        assert_eq!(
            apply_patch(&mut ride, patch, today),
            Err(RideRejection::SeatsBelowBooked { booked: 3 })
        );
        assert_eq!(ride, before);
    }

    #[test]
    fn test_reduce_to_exactly_booked_fills_ride() {
        let mut ride = booked(4, 3);
        let today = ride.date;

        apply_patch(&mut ride, RidePatch { seats: Some(3), ..Default::default() }, today).unwrap();
        assert_eq!(ride.available_seats, 0);
        assert_eq!(ride.status, RideStatus::Full);

        apply_patch(&mut ride, RidePatch { seats: Some(5), ..Default::default() }, today).unwrap();
        assert_eq!(ride.available_seats, 2);
        assert_eq!(ride.status, RideStatus::Active);
    }

    #[test]
    fn test_driver_patch_keeps_owner() {
        let mut ride = ride_with_seats(2);
        let today = ride.date;
        let owner = ride.driver.user_id;

        let patch = RidePatch {
            driver: Some(DriverPatch {
                name: Some("Ravi".to_string()),
                phone: None,
                rating: Some(4.2),
            }),
            ..Default::default()
        };
        apply_patch(&mut ride, patch, today).unwrap();

        assert_eq!(ride.driver.user_id, owner);
        assert_eq!(ride.driver.name, "Ravi");
        assert_eq!(ride.driver.rating, 4.2);
    }

    #[test]
    fn test_driver_user_id_in_json_is_ignored() {
        let patch: RidePatch = serde_json::from_value(serde_json::json!({
            "driver": { "user_id": Uuid::new_v4(), "name": "Mallory" }
        }))
        .unwrap();

        let mut ride = ride_with_seats(2);
        let today = ride.date;
        let owner = ride.driver.user_id;
        apply_patch(&mut ride, patch, today).unwrap();

        assert_eq!(ride.driver.user_id, owner);
        assert_eq!(ride.driver.name, "Mallory");
    }

    #[test]
    fn test_failed_patch_leaves_ride_untouched() {
        let mut ride = ride_with_seats(2);
        let today = ride.date;
        let before = ride.clone();

        let patch = RidePatch {
            from: Some("Nashik".to_string()),
            price: Some(-5.0),
            ..Default::default()
        };
        assert_eq!(apply_patch(&mut ride, patch, today), Err(RideRejection::NegativePrice));
        assert_eq!(ride, before);
    }

    #[test]
    fn test_closed_ride_cannot_be_edited() {
        let mut ride = ride_with_seats(2);
        let today = ride.date;
        ride.status = RideStatus::Cancelled;

        let patch = RidePatch { price: Some(50.0), ..Default::default() };
        assert_eq!(
            apply_patch(&mut ride, patch, today),
            Err(RideRejection::RideClosed(RideStatus::Cancelled))
        );
    }
}
