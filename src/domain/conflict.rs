use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::ride::{BookingStatus, Ride, RideStatus};

pub const DEFAULT_CONFLICT_WINDOW_MINUTES: i64 = 120;

/// The first already-booked ride that starts too close to a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingConflict {
    pub ride_id: Uuid,
    pub route: String,
    pub departure: NaiveDateTime,
}

impl fmt::Display for BookingConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "You already have a ride booked ({}) at {}",
            self.route,
            self.departure.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Scans a user's other bookings for rides starting within a fixed window.
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector {
    window: Duration,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_CONFLICT_WINDOW_MINUTES)
    }
}

impl ConflictDetector {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Return the first ride in `booked` that `user_id` actively holds and
    /// whose departure is strictly closer than the window to `candidate`.
    pub fn find_conflict<'a, I>(
        &self,
        candidate: &Ride,
        user_id: Uuid,
        booked: I,
    ) -> Option<BookingConflict>
    where
        I: IntoIterator<Item = &'a Ride>,
    {
        let start = candidate.departure();

        booked
            .into_iter()
            .filter(|ride| ride.id != candidate.id)
            .filter(|ride| holds_active_booking(ride, user_id))
            .find(|ride| {
                let other = ride.departure();
                let gap = if other > start { other - start } else { start - other };
                gap < self.window
            })
            .map(|ride| BookingConflict {
                ride_id: ride.id,
                route: ride.route(),
                departure: ride.departure(),
            })
    }
}

fn holds_active_booking(ride: &Ride, user_id: Uuid) -> bool {
    let scheduled = matches!(
        ride.status,
        RideStatus::Active | RideStatus::Full | RideStatus::Started
    );

    scheduled
        && ride
            .passenger(user_id)
            .is_some_and(|p| p.status != BookingStatus::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ride::tests::ride_with_seats;
    use crate::domain::ride::Booking;
    use chrono::{NaiveTime, Utc};

    fn booked_at(user: Uuid, hh: u32, mm: u32) -> Ride {
        let mut ride = ride_with_seats(4);
        ride.time = NaiveTime::from_hms_opt(hh, mm, 0).unwrap();
        ride.add_passenger(Booking::confirmed(user, 1, Utc::now()));
        ride
    }

    fn candidate_at(hh: u32, mm: u32) -> Ride {
        let mut ride = ride_with_seats(4);
        ride.time = NaiveTime::from_hms_opt(hh, mm, 0).unwrap();
        ride
    }

    #[test]
    fn test_conflict_inside_window_names_ride() {
        let user = Uuid::new_v4();
        let existing = booked_at(user, 9, 0);
        let candidate = candidate_at(10, 30);

        let conflict = ConflictDetector::default()
            .find_conflict(&candidate, user, [&existing])
            .unwrap();

        assert_eq!(conflict.ride_id, existing.id);
        assert!(conflict.to_string().contains("09:00"));
    }

    #[test]
    fn test_no_conflict_outside_window() {
        let user = Uuid::new_v4();
        let existing = booked_at(user, 9, 0);
        let candidate = candidate_at(11, 1);

        assert!(ConflictDetector::default()
            .find_conflict(&candidate, user, [&existing])
            .is_none());
    }

    #[test]
    fn test_exactly_window_apart_is_allowed() {
        let user = Uuid::new_v4();
        let existing = booked_at(user, 9, 0);
        let candidate = candidate_at(11, 0);

        assert!(ConflictDetector::default()
            .find_conflict(&candidate, user, [&existing])
            .is_none());
    }

    #[test]
    fn test_conflict_across_midnight() {
        let user = Uuid::new_v4();
        let mut existing = booked_at(user, 23, 30);
        existing.date = existing.date.pred_opt().unwrap();
        let candidate = candidate_at(0, 45);

        assert!(ConflictDetector::default()
            .find_conflict(&candidate, user, [&existing])
            .is_some());
    }

    #[test]
    fn test_ignores_cancelled_and_finished_rides() {
        let user = Uuid::new_v4();
        let candidate = candidate_at(9, 30);

        let mut cancelled_ride = booked_at(user, 9, 0);
        cancelled_ride.status = RideStatus::Cancelled;

        let mut completed_ride = booked_at(user, 9, 15);
        completed_ride.status = RideStatus::Completed;

        let mut cancelled_booking = booked_at(user, 9, 45);
        cancelled_booking.passengers[0].status = BookingStatus::Cancelled;

        assert!(ConflictDetector::default()
            .find_conflict(
                &candidate,
                user,
                [&cancelled_ride, &completed_ride, &cancelled_booking]
            )
            .is_none());
    }

    #[test]
    fn test_ignores_candidate_itself_and_other_users() {
        let user = Uuid::new_v4();
        let mut candidate = booked_at(user, 9, 0);
        let someone_else = booked_at(Uuid::new_v4(), 9, 0);

        let detector = ConflictDetector::from_minutes(120);
        assert!(detector
            .find_conflict(&candidate.clone(), user, [&candidate, &someone_else])
            .is_none());

        candidate.id = Uuid::new_v4();
        assert!(detector.find_conflict(&candidate, user, [&someone_else]).is_none());
    }

    #[test]
    fn test_reports_first_conflict_only() {
        let user = Uuid::new_v4();
        let first = booked_at(user, 8, 30);
        let second = booked_at(user, 9, 30);
        let candidate = candidate_at(9, 0);

        let conflict = ConflictDetector::default()
            .find_conflict(&candidate, user, [&first, &second])
            .unwrap();
        assert_eq!(conflict.ride_id, first.id);
    }
}
