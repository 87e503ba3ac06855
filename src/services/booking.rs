use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::lifecycle;
use crate::domain::{
    apply_patch, validate_booking, Booking, BookingConflict, BookingRejection, BookingStatus,
    ConflictDetector, Driver, LifecycleError, PaymentStatus, Ride, RideDraft, RidePatch,
    RideRejection, RideStatus,
};
use crate::notify::{NewNotification, NotificationKind, Notifier, Priority};
use crate::store::{RideFilter, RideStore, StoreError};
use crate::utils::paging::page_offset;

pub const DEFAULT_RETRY_LIMIT: u32 = 5;
pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Ride not found")]
    RideNotFound,
    #[error("Booking not found")]
    BookingNotFound,
    #[error(transparent)]
    Rejected(#[from] BookingRejection),
    #[error("{0}")]
    Conflict(BookingConflict),
    #[error(transparent)]
    RideClosed(#[from] LifecycleError),
    #[error("Booking has been cancelled")]
    BookingCancelled,
    #[error("Ride is busy, please retry")]
    Busy,
    #[error("Failed to {action}: {source}")]
    Store {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

impl From<StoreError> for BookingError {
    fn from(source: StoreError) -> Self {
        BookingError::Store {
            action: "update booking",
            source,
        }
    }
}

impl BookingError {
    /// Name the operation a storage failure interrupted.
    fn during(self, action: &'static str) -> Self {
        match self {
            BookingError::Store { source, .. } => BookingError::Store { action, source },
            other => other,
        }
    }
}

#[derive(Debug, Error)]
pub enum RideError {
    #[error("Ride not found")]
    NotFound,
    #[error("Ride not found or you are not authorized to edit it")]
    NotOwner,
    #[error(transparent)]
    Invalid(#[from] RideRejection),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("Cannot delete a ride that already has passengers")]
    HasPassengers,
    #[error("Ride is busy, please retry")]
    Busy,
    #[error("Failed to update ride: {0}")]
    Store(#[from] StoreError),
}

/// Errors the optimistic commit loop needs to produce on its own.
trait CommitError: From<StoreError> {
    fn not_found() -> Self;
    fn busy() -> Self;
}

impl CommitError for BookingError {
    fn not_found() -> Self {
        BookingError::RideNotFound
    }
    fn busy() -> Self {
        BookingError::Busy
    }
}

impl CommitError for RideError {
    fn not_found() -> Self {
        RideError::NotFound
    }
    fn busy() -> Self {
        RideError::Busy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub ride: Ride,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub refunded_seats: i32,
    pub refund_amount: f64,
    pub ride: Ride,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RideSearch {
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<NaiveDate>,
    pub passengers: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverRide {
    #[serde(flatten)]
    pub ride: Ride,
    pub booked_seats: i32,
    pub total_earnings: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookedRidesQuery {
    pub status: Option<RideStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookedRide {
    #[serde(flatten)]
    pub ride: Ride,
    pub my_booking: Booking,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookingSummary {
    pub total: u64,
    pub upcoming: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub total_spent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookedRides {
    pub rides: Vec<BookedRide>,
    pub summary: BookingSummary,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}

/// Seat inventory operations over a [`RideStore`].
///
/// Every mutation loads a ride, validates against that snapshot and commits
/// with the snapshot's version. A version conflict reloads, revalidates and
/// tries again, so two requests racing for the last seat cannot both win.
pub struct BookingEngine {
    store: Arc<dyn RideStore>,
    notifier: Notifier,
    conflicts: ConflictDetector,
    retry_limit: u32,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn RideStore>,
        notifier: Notifier,
        conflicts: ConflictDetector,
        retry_limit: u32,
    ) -> Self {
        Self {
            store,
            notifier,
            conflicts,
            retry_limit: retry_limit.max(1),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    // ============ Ride Management ============

    pub async fn create_ride(&self, driver: Driver, draft: RideDraft) -> Result<Ride, RideError> {
        let now = Utc::now();
        let ride = Ride::create(draft, driver, now.date_naive(), now)?;
        self.store.insert_ride(&ride).await?;

        tracing::info!(
            ride_id = %ride.id,
            driver_id = %ride.driver.user_id,
            route = %ride.route(),
            seats = ride.seats,
            "Ride created"
        );
        Ok(ride)
    }

    pub async fn get_ride(&self, ride_id: Uuid) -> Result<Ride, RideError> {
        let ride = self.store.load_ride(ride_id).await?.ok_or(RideError::NotFound)?;
        Ok(settle(ride, Utc::now().date_naive()))
    }

    /// Open rides matching the search, cheapest first.
    pub async fn search_rides(&self, search: RideSearch) -> Result<Vec<Ride>, RideError> {
        let today = Utc::now().date_naive();
        let filter = RideFilter {
            from: search.from.filter(|s| !s.trim().is_empty()),
            to: search.to.filter(|s| !s.trim().is_empty()),
            date: search.date,
            min_available: Some(search.passengers.unwrap_or(1).max(1)),
            statuses: Some(vec![RideStatus::Active]),
            ..Default::default()
        };

        let mut rides: Vec<Ride> = self
            .store
            .list_rides(&filter)
            .await?
            .into_iter()
            .map(|r| settle(r, today))
            .filter(|r| r.status == RideStatus::Active)
            .collect();

        rides.sort_by(|a, b| a.price.total_cmp(&b.price));
        Ok(rides)
    }

    /// Rides the user drives, latest departure first.
    pub async fn driver_rides(&self, user_id: Uuid) -> Result<Vec<DriverRide>, RideError> {
        let today = Utc::now().date_naive();
        let mut rides = self.store.list_rides(&RideFilter::driven_by(user_id)).await?;
        rides.sort_by_key(|r| std::cmp::Reverse(r.departure()));

        Ok(rides
            .into_iter()
            .map(|r| {
                let ride = settle(r, today);
                DriverRide {
                    booked_seats: ride.booked_seats(),
                    total_earnings: ride.total_earnings(),
                    ride,
                }
            })
            .collect())
    }

    /// Rides the user drives or has a booking on.
    pub async fn participant_rides(&self, user_id: Uuid) -> Result<Vec<Ride>, RideError> {
        let today = Utc::now().date_naive();
        let mut rides = self.store.list_rides(&RideFilter::driven_by(user_id)).await?;
        rides.extend(self.store.list_rides(&RideFilter::booked_by(user_id)).await?);
        Ok(rides.into_iter().map(|r| settle(r, today)).collect())
    }

    pub async fn edit_ride(
        &self,
        ride_id: Uuid,
        owner_id: Uuid,
        patch: RidePatch,
    ) -> Result<Ride, RideError> {
        let today = Utc::now().date_naive();
        let ride = self.store.load_ride(ride_id).await?.ok_or(RideError::NotOwner)?;

        let (ride, ()) = self
            .commit_with_retry(ride, today, |ride| {
                if !ride.is_driver(owner_id) {
                    return Err(RideError::NotOwner);
                }
                apply_patch(ride, patch.clone(), today)?;
                Ok(())
            })
            .await?;

        tracing::info!(ride_id = %ride.id, version = ride.version, "Ride updated");
        Ok(ride)
    }

    /// Only the owner may delete, and only while nobody has booked.
    pub async fn delete_ride(&self, ride_id: Uuid, owner_id: Uuid) -> Result<(), RideError> {
        let ride = self.store.load_ride(ride_id).await?.ok_or(RideError::NotOwner)?;
        if !ride.is_driver(owner_id) {
            return Err(RideError::NotOwner);
        }
        if !ride.passengers.is_empty() {
            return Err(RideError::HasPassengers);
        }

        match self.store.delete_ride(ride.id, ride.version).await {
            Ok(()) => {
                tracing::info!(ride_id = %ride.id, "Ride deleted");
                Ok(())
            }
            Err(StoreError::VersionConflict) => Err(RideError::Busy),
            Err(e) => Err(e.into()),
        }
    }

    /// Explicit driver transition. Cancelling notifies every passenger.
    pub async fn set_ride_status(
        &self,
        ride_id: Uuid,
        owner_id: Uuid,
        status: RideStatus,
    ) -> Result<Ride, RideError> {
        let today = Utc::now().date_naive();
        let ride = self.store.load_ride(ride_id).await?.ok_or(RideError::NotOwner)?;

        let (ride, ()) = self
            .commit_with_retry(ride, today, |ride| {
                if !ride.is_driver(owner_id) {
                    return Err(RideError::NotOwner);
                }
                lifecycle::transition(ride, status)?;
                if status == RideStatus::Cancelled {
                    for p in ride.passengers.iter_mut() {
                        p.status = BookingStatus::Cancelled;
                        if p.payment_status == PaymentStatus::Completed {
                            p.payment_status = PaymentStatus::Refunded;
                        }
                    }
                }
                Ok(())
            })
            .await?;

        tracing::info!(ride_id = %ride.id, status = %ride.status, "Ride status changed");

        if status == RideStatus::Cancelled {
            self.notifier.dispatch(ride_cancelled_notices(&ride));
        }
        Ok(ride)
    }

    /// Idempotent date sweep. Returns how many rides were completed.
    pub async fn sweep_completed(&self, today: NaiveDate) -> Result<u64, StoreError> {
        let completed = self.store.complete_past_rides(today).await?;
        if completed > 0 {
            tracing::info!(completed, %today, "Marked past rides as completed");
        }
        Ok(completed)
    }

    // ============ Booking ============

    pub async fn book_ride(
        &self,
        ride_id: Uuid,
        user_id: Uuid,
        seats: i32,
    ) -> Result<BookingOutcome, BookingError> {
        let now = Utc::now();
        let today = now.date_naive();

        let ride = self
            .store
            .load_ride(ride_id)
            .await
            .map_err(failed("book ride"))?
            .ok_or(BookingError::RideNotFound)?;

        let (ride, booking) = self
            .commit_booking(ride, user_id, today, |ride| {
                validate_booking(ride, user_id, seats, today)?;
                let booking = Booking::confirmed(user_id, seats, now);
                ride.add_passenger(booking.clone());
                Ok(booking)
            })
            .await
            .map_err(|e| e.during("book ride"))?;

        tracing::info!(
            ride_id = %ride.id,
            user_id = %user_id,
            seats,
            available_seats = ride.available_seats,
            status = %ride.status,
            "Ride booked"
        );

        self.notifier.dispatch(booked_notices(&ride, &booking));
        Ok(BookingOutcome { booking, ride })
    }

    pub async fn cancel_booking(
        &self,
        ride_id: Uuid,
        user_id: Uuid,
        reason: Option<String>,
    ) -> Result<CancellationOutcome, BookingError> {
        let today = Utc::now().date_naive();
        let ride = self
            .store
            .load_ride(ride_id)
            .await
            .map_err(failed("cancel booking"))?
            .ok_or(BookingError::RideNotFound)?;

        let (ride, removed) = self
            .commit_with_retry(ride, today, |ride| {
                if ride.passenger(user_id).is_none() {
                    return Err(BookingError::BookingNotFound);
                }
                lifecycle::ensure_mutable(ride)?;
                ride.remove_passenger(user_id).ok_or(BookingError::BookingNotFound)
            })
            .await
            .map_err(|e| e.during("cancel booking"))?;

        let refund_amount = if removed.is_paid() {
            ride.price * f64::from(removed.seats_booked)
        } else {
            0.0
        };

        tracing::info!(
            ride_id = %ride.id,
            user_id = %user_id,
            refunded_seats = removed.seats_booked,
            refund_amount,
            "Booking cancelled"
        );

        self.notifier
            .dispatch(cancelled_notices(&ride, &removed, refund_amount, reason.as_deref()));

        Ok(CancellationOutcome {
            refunded_seats: removed.seats_booked,
            refund_amount,
            ride,
        })
    }

    /// Record a completed payment. Creates the booking through the normal
    /// booking checks when the payer has not booked yet.
    pub async fn confirm_payment(
        &self,
        ride_id: Uuid,
        user_id: Uuid,
        payment_id: String,
        seats: i32,
    ) -> Result<BookingOutcome, BookingError> {
        let now = Utc::now();
        let today = now.date_naive();

        let ride = self
            .store
            .load_ride(ride_id)
            .await
            .map_err(failed("confirm payment"))?
            .ok_or(BookingError::RideNotFound)?;

        let (ride, booking) = self
            .commit_booking(ride, user_id, today, |ride| {
                if ride.passenger(user_id).is_some() {
                    lifecycle::ensure_mutable(ride)?;
                }
                if let Some(existing) = ride.passenger_mut(user_id) {
                    if existing.status == BookingStatus::Cancelled {
                        return Err(BookingError::BookingCancelled);
                    }
                    existing.payment_status = PaymentStatus::Completed;
                    existing.payment_id = Some(payment_id.clone());
                    existing.status = BookingStatus::Confirmed;
                    return Ok(existing.clone());
                }

                validate_booking(ride, user_id, seats, today)?;
                let mut booking = Booking::confirmed(user_id, seats, now);
                booking.payment_status = PaymentStatus::Completed;
                booking.payment_id = Some(payment_id.clone());
                ride.add_passenger(booking.clone());
                Ok(booking)
            })
            .await
            .map_err(|e| e.during("confirm payment"))?;

        let amount = ride.price * f64::from(booking.seats_booked);
        tracing::info!(
            ride_id = %ride.id,
            user_id = %user_id,
            payment_id = %payment_id,
            amount,
            "Payment confirmed"
        );

        self.notifier.dispatch(vec![
            NewNotification::new(
                ride.driver.user_id,
                NotificationKind::PaymentReceived,
                "Payment Received",
                format!("You received {:.2} for your ride to {}", amount, ride.to),
            )
            .metadata(serde_json::json!({
                "ride_id": ride.id,
                "amount": amount,
                "payment_id": payment_id,
            })),
        ]);

        Ok(BookingOutcome { booking, ride })
    }

    // ============ Queries ============

    pub async fn get_user_booked_rides(
        &self,
        user_id: Uuid,
        query: BookedRidesQuery,
    ) -> Result<BookedRides, BookingError> {
        let today = Utc::now().date_naive();
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);

        let mut booked: Vec<BookedRide> = self
            .store
            .list_rides(&RideFilter::booked_by(user_id))
            .await
            .map_err(failed("load bookings"))?
            .into_iter()
            .filter_map(|r| {
                let ride = settle(r, today);
                let my_booking = ride.passenger(user_id)?.clone();
                Some(BookedRide { ride, my_booking })
            })
            .collect();

        let summary = summarize(&booked, today);

        if let Some(status) = query.status {
            booked.retain(|b| b.ride.status == status);
        }
        booked.sort_by_key(|b| std::cmp::Reverse(b.ride.departure()));

        let total = booked.len() as u64;
        let rides = booked
            .into_iter()
            .skip(usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();

        Ok(BookedRides {
            rides,
            summary,
            page,
            limit,
            total,
        })
    }

    // ============ Internals ============

    async fn check_conflicts(&self, ride: &Ride, user_id: Uuid) -> Result<(), BookingError> {
        let booked = self.store.list_rides(&RideFilter::booked_by(user_id)).await?;
        match self.conflicts.find_conflict(ride, user_id, &booked) {
            Some(conflict) => {
                tracing::debug!(
                    ride_id = %ride.id,
                    user_id = %user_id,
                    conflicting_ride = %conflict.ride_id,
                    "Booking conflicts with an existing ride"
                );
                Err(BookingError::Conflict(conflict))
            }
            None => Ok(()),
        }
    }

    /// Apply `change` to `ride` and commit it with the snapshot version.
    ///
    /// On a version conflict the ride is reloaded and `change` runs again
    /// against the fresh snapshot, up to `retry_limit` commits. Every
    /// snapshot gets the date sweep first, so a ride past its date is
    /// already terminal when `change` sees it.
    async fn commit_with_retry<T, E, F>(
        &self,
        mut ride: Ride,
        today: NaiveDate,
        mut change: F,
    ) -> Result<(Ride, T), E>
    where
        E: CommitError,
        F: FnMut(&mut Ride) -> Result<T, E>,
    {
        let mut attempt = 0;
        loop {
            if let Some(done) = self.try_commit::<_, E, _>(&mut ride, today, &mut change).await? {
                return Ok(done);
            }
            attempt += 1;
            ride = self.reload_after_conflict::<E>(ride.id, attempt).await?;
        }
    }

    /// [`Self::commit_with_retry`] for changes that may add `user_id` as a
    /// passenger. The schedule-conflict scan reruns on every fresh snapshot.
    async fn commit_booking<T, F>(
        &self,
        mut ride: Ride,
        user_id: Uuid,
        today: NaiveDate,
        mut change: F,
    ) -> Result<(Ride, T), BookingError>
    where
        F: FnMut(&mut Ride) -> Result<T, BookingError>,
    {
        let mut attempt = 0;
        loop {
            if ride.passenger(user_id).is_none() {
                self.check_conflicts(&ride, user_id).await?;
            }
            let committed = self
                .try_commit::<_, BookingError, _>(&mut ride, today, &mut change)
                .await?;
            if let Some(done) = committed {
                return Ok(done);
            }
            attempt += 1;
            ride = self
                .reload_after_conflict::<BookingError>(ride.id, attempt)
                .await?;
        }
    }

    /// One validate-and-commit pass. `None` means the snapshot was stale.
    async fn try_commit<T, E, F>(
        &self,
        ride: &mut Ride,
        today: NaiveDate,
        change: &mut F,
    ) -> Result<Option<(Ride, T)>, E>
    where
        E: CommitError,
        F: FnMut(&mut Ride) -> Result<T, E>,
    {
        lifecycle::complete_if_past(ride, today);
        let outcome = change(ride)?;

        match self.store.commit_ride(ride).await {
            Ok(committed) => Ok(Some((committed, outcome))),
            Err(StoreError::VersionConflict) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn reload_after_conflict<E: CommitError>(
        &self,
        ride_id: Uuid,
        attempt: u32,
    ) -> Result<Ride, E> {
        if attempt >= self.retry_limit {
            tracing::warn!(ride_id = %ride_id, attempt, "Giving up after repeated version conflicts");
            return Err(E::busy());
        }
        tracing::debug!(ride_id = %ride_id, attempt, "Version conflict, reloading ride");
        backoff(attempt).await;
        self.store.load_ride(ride_id).await?.ok_or_else(E::not_found)
    }
}

fn failed(action: &'static str) -> impl Fn(StoreError) -> BookingError {
    move |source| BookingError::Store { action, source }
}

/// Exponential backoff with jitter between commit attempts.
async fn backoff(attempt: u32) {
    let base = 5u64 << attempt.min(6);
    let jitter = rand::thread_rng().gen_range(0..=base);
    tokio::time::sleep(Duration::from_millis(base + jitter)).await;
}

/// On-read date sweep; the periodic task persists the same change.
fn settle(mut ride: Ride, today: NaiveDate) -> Ride {
    lifecycle::complete_if_past(&mut ride, today);
    ride
}

fn summarize(booked: &[BookedRide], today: NaiveDate) -> BookingSummary {
    let mut summary = BookingSummary::default();
    for b in booked {
        summary.total += 1;
        let cancelled =
            b.ride.status == RideStatus::Cancelled || b.my_booking.status == BookingStatus::Cancelled;

        if cancelled {
            summary.cancelled += 1;
        } else if b.ride.status == RideStatus::Completed {
            summary.completed += 1;
        } else if b.ride.date >= today {
            summary.upcoming += 1;
        }

        if b.my_booking.is_paid() {
            summary.total_spent += b.ride.price * f64::from(b.my_booking.seats_booked);
        }
    }
    summary
}

fn booked_notices(ride: &Ride, booking: &Booking) -> Vec<NewNotification> {
    let metadata = serde_json::json!({
        "ride_id": ride.id,
        "booking_id": booking.id,
        "seats_booked": booking.seats_booked,
    });

    vec![
        NewNotification::new(
            booking.user_id,
            NotificationKind::RideBooked,
            "Ride Booked Successfully!",
            format!(
                "Your ride with {} has been confirmed for {}",
                ride.driver.name, ride.date
            ),
        )
        .metadata(metadata.clone()),
        NewNotification::new(
            ride.driver.user_id,
            NotificationKind::BookingReceived,
            "New Booking",
            format!(
                "{} seat(s) booked on {} for {}",
                booking.seats_booked,
                ride.route(),
                ride.date
            ),
        )
        .metadata(metadata),
    ]
}

fn cancelled_notices(
    ride: &Ride,
    removed: &Booking,
    refund_amount: f64,
    reason: Option<&str>,
) -> Vec<NewNotification> {
    let metadata = serde_json::json!({
        "ride_id": ride.id,
        "booking_id": removed.id,
        "refunded_seats": removed.seats_booked,
        "refund_amount": refund_amount,
        "reason": reason,
    });

    vec![
        NewNotification::new(
            removed.user_id,
            NotificationKind::BookingCancelled,
            "Booking Cancelled",
            format!("Your booking on {} for {} was cancelled", ride.route(), ride.date),
        )
        .metadata(metadata.clone()),
        NewNotification::new(
            ride.driver.user_id,
            NotificationKind::BookingCancelled,
            "Passenger Cancelled",
            format!(
                "{} seat(s) were released on {} for {}",
                removed.seats_booked,
                ride.route(),
                ride.date
            ),
        )
        .metadata(metadata),
    ]
}

fn ride_cancelled_notices(ride: &Ride) -> Vec<NewNotification> {
    ride.passengers
        .iter()
        .map(|p| {
            let refund_amount = if p.payment_status == PaymentStatus::Refunded {
                ride.price * f64::from(p.seats_booked)
            } else {
                0.0
            };
            NewNotification::new(
                p.user_id,
                NotificationKind::RideCancelled,
                "Ride Cancelled",
                format!(
                    "Unfortunately, your ride on {} has been cancelled. Refund: {:.2}",
                    ride.date, refund_amount
                ),
            )
            .priority(Priority::High)
            .metadata(serde_json::json!({
                "ride_id": ride.id,
                "refund_amount": refund_amount,
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ride::tests::ride_with_seats;

    fn booked_ride(status: RideStatus, paid: bool) -> BookedRide {
        let mut ride = ride_with_seats(4);
        let mut booking = Booking::confirmed(Uuid::new_v4(), 2, Utc::now());
        if paid {
            booking.payment_status = PaymentStatus::Completed;
        }
        ride.add_passenger(booking.clone());
        ride.status = status;
        BookedRide { ride, my_booking: booking }
    }

    #[test]
    fn test_summary_counts_each_bucket() {
        let today = ride_with_seats(1).date;
        let rides = vec![
            booked_ride(RideStatus::Active, true),
            booked_ride(RideStatus::Started, false),
            booked_ride(RideStatus::Completed, true),
            booked_ride(RideStatus::Cancelled, false),
        ];

        let summary = summarize(&rides, today);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.upcoming, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.total_spent, 400.0);
    }

    #[test]
    fn test_cancelled_ride_notice_carries_refund() {
        let mut ride = ride_with_seats(4);
        let mut paid = Booking::confirmed(Uuid::new_v4(), 2, Utc::now());
        paid.payment_status = PaymentStatus::Refunded;
        ride.add_passenger(paid);
        ride.add_passenger(Booking::confirmed(Uuid::new_v4(), 1, Utc::now()));

        let notices = ride_cancelled_notices(&ride);
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].priority, Priority::High);
        assert_eq!(notices[0].metadata["refund_amount"], 200.0);
        assert_eq!(notices[1].metadata["refund_amount"], 0.0);
    }
}
