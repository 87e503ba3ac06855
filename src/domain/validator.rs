use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::lifecycle;
use crate::domain::ride::{Ride, RideStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingRejection {
    #[error("Must book at least 1 seat")]
    InvalidSeatCount,
    #[error("Only {available} seats available")]
    NotEnoughSeats { available: i32 },
    #[error("Cannot book your own ride")]
    OwnRide,
    #[error("You have already booked this ride")]
    AlreadyBooked,
    #[error("Ride has already departed")]
    RidePassed,
    #[error("Ride is not available for booking ({status})")]
    NotBookable { status: RideStatus },
}

/// Decide whether `user_id` may book `seats` on `ride`.
///
/// Checks run in a fixed order and stop at the first failure. Same-day
/// rides remain bookable.
pub fn validate_booking(
    ride: &Ride,
    user_id: Uuid,
    seats: i32,
    today: NaiveDate,
) -> Result<(), BookingRejection> {
    if seats < 1 {
        return Err(BookingRejection::InvalidSeatCount);
    }

    if ride.available_seats < seats {
        return Err(BookingRejection::NotEnoughSeats {
            available: ride.available_seats,
        });
    }

    if ride.is_driver(user_id) {
        return Err(BookingRejection::OwnRide);
    }

    if ride.passenger(user_id).is_some() {
        return Err(BookingRejection::AlreadyBooked);
    }

    if ride.date < today {
        return Err(BookingRejection::RidePassed);
    }

    if !lifecycle::accepts_bookings(ride.status) {
        return Err(BookingRejection::NotBookable {
            status: ride.status,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ride::tests::ride_with_seats;
    use crate::domain::ride::Booking;
    use chrono::Utc;

    #[test]
    fn test_accepts_valid_booking() {
        let ride = ride_with_seats(4);
        assert_eq!(validate_booking(&ride, Uuid::new_v4(), 4, ride.date), Ok(()));
    }

    #[test]
    fn test_rejects_zero_seats() {
        let ride = ride_with_seats(4);
        assert_eq!(
            validate_booking(&ride, Uuid::new_v4(), 0, ride.date),
            Err(BookingRejection::InvalidSeatCount)
        );
    }

    #[test]
    fn test_rejects_when_seats_run_out() {
        let ride = ride_with_seats(2);
        let err = validate_booking(&ride, Uuid::new_v4(), 3, ride.date).unwrap_err();
        assert_eq!(err, BookingRejection::NotEnoughSeats { available: 2 });
        assert_eq!(err.to_string(), "Only 2 seats available");
    }

    #[test]
    fn test_rejects_driver_booking_own_ride() {
        let ride = ride_with_seats(2);
        assert_eq!(
            validate_booking(&ride, ride.driver.user_id, 1, ride.date),
            Err(BookingRejection::OwnRide)
        );
    }

    #[test]
    fn test_rejects_duplicate_passenger() {
        let mut ride = ride_with_seats(4);
        let rider = Uuid::new_v4();
        ride.add_passenger(Booking::confirmed(rider, 1, Utc::now()));

        assert_eq!(
            validate_booking(&ride, rider, 1, ride.date),
            Err(BookingRejection::AlreadyBooked)
        );
    }

    #[test]
    fn test_same_day_allowed_past_day_rejected() {
        let ride = ride_with_seats(2);
        let rider = Uuid::new_v4();

        assert!(validate_booking(&ride, rider, 1, ride.date).is_ok());
        assert_eq!(
            validate_booking(&ride, rider, 1, ride.date.succ_opt().unwrap()),
            Err(BookingRejection::RidePassed)
        );
    }

    #[test]
    fn test_rejects_closed_statuses_but_allows_started() {
        let mut ride = ride_with_seats(2);
        let rider = Uuid::new_v4();

        ride.status = RideStatus::Started;
        assert!(validate_booking(&ride, rider, 1, ride.date).is_ok());

        for status in [RideStatus::Completed, RideStatus::Cancelled] {
            ride.status = status;
            assert_eq!(
                validate_booking(&ride, rider, 1, ride.date),
                Err(BookingRejection::NotBookable { status })
            );
        }
    }

    #[test]
    fn test_seat_check_runs_before_ownership_check() {
        let mut ride = ride_with_seats(1);
        ride.add_passenger(Booking::confirmed(Uuid::new_v4(), 1, Utc::now()));

        // Full ride: even the driver is told about seats first
        assert_eq!(
            validate_booking(&ride, ride.driver.user_id, 1, ride.date),
            Err(BookingRejection::NotEnoughSeats { available: 0 })
        );
    }
}
