use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::ride::{Ride, RideStatus};

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Active => "active",
            RideStatus::Full => "full",
            RideStatus::Started => "started",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Ride is {0} and can no longer change")]
    Terminal(RideStatus),
    #[error("Cannot move a ride from {from} to {to}")]
    InvalidTransition { from: RideStatus, to: RideStatus },
}

pub fn is_terminal(status: RideStatus) -> bool {
    matches!(status, RideStatus::Completed | RideStatus::Cancelled)
}

pub fn accepts_bookings(status: RideStatus) -> bool {
    matches!(status, RideStatus::Active | RideStatus::Started)
}

/// Seat mutations are refused once a ride reaches a terminal state.
pub fn ensure_mutable(ride: &Ride) -> Result<(), LifecycleError> {
    if is_terminal(ride.status) {
        return Err(LifecycleError::Terminal(ride.status));
    }
    Ok(())
}

/// Flip between `active` and `full` to match the seat pool.
pub fn refresh_capacity_status(ride: &mut Ride) {
    match ride.status {
        RideStatus::Active if ride.available_seats == 0 => ride.status = RideStatus::Full,
        RideStatus::Full if ride.available_seats > 0 => ride.status = RideStatus::Active,
        _ => {}
    }
}

/// Date sweep for one ride. Returns true when the status changed.
pub fn complete_if_past(ride: &mut Ride, today: NaiveDate) -> bool {
    let open = matches!(ride.status, RideStatus::Active | RideStatus::Full);
    if open && ride.date < today {
        ride.status = RideStatus::Completed;
        return true;
    }
    false
}

/// Explicit status change requested by the driver.
///
/// `active` and `full` are derived from the seat pool and cannot be set.
pub fn transition(ride: &mut Ride, to: RideStatus) -> Result<(), LifecycleError> {
    let from = ride.status;
    ensure_mutable(ride)?;

    let allowed = match to {
        RideStatus::Started => matches!(from, RideStatus::Active | RideStatus::Full),
        RideStatus::Completed | RideStatus::Cancelled => true,
        RideStatus::Active | RideStatus::Full => false,
    };

    if !allowed {
        return Err(LifecycleError::InvalidTransition { from, to });
    }

    ride.status = to;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ride::tests::ride_with_seats;
    use crate::domain::ride::Booking;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_full_and_back_to_active() {
        let mut ride = ride_with_seats(2);
        let rider = Uuid::new_v4();

        ride.add_passenger(Booking::confirmed(rider, 2, Utc::now()));
        assert_eq!(ride.status, RideStatus::Full);

        ride.remove_passenger(rider);
        assert_eq!(ride.status, RideStatus::Active);
    }

    #[test]
    fn test_started_ride_stays_started_when_filled() {
        let mut ride = ride_with_seats(1);
        ride.status = RideStatus::Started;
        ride.add_passenger(Booking::confirmed(Uuid::new_v4(), 1, Utc::now()));

        assert_eq!(ride.status, RideStatus::Started);
    }

    #[test]
    fn test_sweep_completes_only_open_past_rides() {
        let mut ride = ride_with_seats(2);
        let today = ride.date;
        let tomorrow = today.succ_opt().unwrap();

        assert!(!complete_if_past(&mut ride, today));
        assert_eq!(ride.status, RideStatus::Active);

        assert!(complete_if_past(&mut ride, tomorrow));
        assert_eq!(ride.status, RideStatus::Completed);

        // Idempotent
        assert!(!complete_if_past(&mut ride, tomorrow));

        let mut cancelled = ride_with_seats(2);
        cancelled.status = RideStatus::Cancelled;
        assert!(!complete_if_past(&mut cancelled, tomorrow));
        assert_eq!(cancelled.status, RideStatus::Cancelled);
    }

    #[test]
    fn test_driver_transitions() {
        let mut ride = ride_with_seats(2);
        transition(&mut ride, RideStatus::Started).unwrap();
        assert_eq!(
            transition(&mut ride, RideStatus::Started),
            Err(LifecycleError::InvalidTransition {
                from: RideStatus::Started,
                to: RideStatus::Started
            })
        );
        transition(&mut ride, RideStatus::Completed).unwrap();
        assert_eq!(
            transition(&mut ride, RideStatus::Cancelled),
            Err(LifecycleError::Terminal(RideStatus::Completed))
        );
    }

    #[test]
    fn test_derived_statuses_cannot_be_set() {
        let mut ride = ride_with_seats(2);
        assert!(matches!(
            transition(&mut ride, RideStatus::Full),
            Err(LifecycleError::InvalidTransition { .. })
        ));
        assert!(matches!(
            transition(&mut ride, RideStatus::Active),
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut ride = ride_with_seats(2);
        transition(&mut ride, RideStatus::Cancelled).unwrap();
        assert_eq!(ensure_mutable(&ride), Err(LifecycleError::Terminal(RideStatus::Cancelled)));
    }
}
