//! Payment transaction ledger.
//!
//! Rows are written after a payment is confirmed on a ride and flipped to
//! `refunded` when the paid booking is cancelled. Gateway order creation
//! and signature checks happen before a payment reaches this service.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::payment_transaction::{self, PaymentStatus};
use crate::entities::ride;
use crate::services::booking::BookingOutcome;

pub const DEFAULT_CURRENCY: &str = "INR";
/// Most recent entries returned by [`history`].
pub const HISTORY_LIMIT: u64 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub ride_id: Uuid,
    pub payment_id: String,
    pub seats_booked: i32,
    pub amount: f64,
}

impl NewTransaction {
    /// Ledger entry for the booking a payment confirmed.
    pub fn for_payment(outcome: &BookingOutcome) -> Option<Self> {
        let booking = &outcome.booking;
        let payment_id = booking.payment_id.clone()?;
        Some(Self {
            user_id: booking.user_id,
            ride_id: outcome.ride.id,
            payment_id,
            seats_booked: booking.seats_booked,
            amount: outcome.ride.price * f64::from(booking.seats_booked),
        })
    }
}

/// Ride fields shown next to a transaction.
#[derive(Debug, Clone, Serialize)]
pub struct RideBrief {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
    pub price: f64,
    pub driver_user_id: Uuid,
}

impl From<ride::Model> for RideBrief {
    fn from(r: ride::Model) -> Self {
        Self {
            id: r.id,
            from: r.from_label,
            to: r.to_label,
            date: r.departure_date,
            price: r.price,
            driver_user_id: r.driver_user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: payment_transaction::Model,
    pub ride: Option<RideBrief>,
}

impl From<(payment_transaction::Model, Option<ride::Model>)> for TransactionView {
    fn from((transaction, ride): (payment_transaction::Model, Option<ride::Model>)) -> Self {
        Self {
            transaction,
            ride: ride.map(RideBrief::from),
        }
    }
}

pub async fn record(
    db: &DatabaseConnection,
    entry: &NewTransaction,
    now: DateTime<Utc>,
) -> Result<payment_transaction::Model, DbErr> {
    payment_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(entry.user_id),
        ride_id: Set(Some(entry.ride_id)),
        payment_id: Set(entry.payment_id.clone()),
        seats_booked: Set(entry.seats_booked),
        amount: Set(entry.amount),
        currency: Set(DEFAULT_CURRENCY.to_string()),
        status: Set(PaymentStatus::Completed),
        refund_amount: Set(None),
        refunded_at: Set(None),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await
}

/// The user's latest transactions, newest first.
pub async fn history(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<TransactionView>, DbErr> {
    let rows = payment_transaction::Entity::find()
        .filter(payment_transaction::Column::UserId.eq(user_id))
        .order_by_desc(payment_transaction::Column::CreatedAt)
        .limit(HISTORY_LIMIT)
        .find_also_related(ride::Entity)
        .all(db)
        .await?;

    Ok(rows.into_iter().map(TransactionView::from).collect())
}

/// One transaction, only if it belongs to `user_id`.
pub async fn find_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<TransactionView>, DbErr> {
    let row = payment_transaction::Entity::find_by_id(id)
        .filter(payment_transaction::Column::UserId.eq(user_id))
        .find_also_related(ride::Entity)
        .one(db)
        .await?;

    Ok(row.map(TransactionView::from))
}

/// Mark completed payments on a ride as refunded in full. With `user_id`
/// only that passenger's payments change.
pub async fn mark_refunded(
    db: &DatabaseConnection,
    ride_id: Uuid,
    user_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let mut query = payment_transaction::Entity::find()
        .filter(payment_transaction::Column::RideId.eq(ride_id))
        .filter(payment_transaction::Column::Status.eq(PaymentStatus::Completed));
    if let Some(user_id) = user_id {
        query = query.filter(payment_transaction::Column::UserId.eq(user_id));
    }

    let paid = query.all(db).await?;
    let refunded = paid.len() as u64;

    for transaction in paid {
        let amount = transaction.amount;
        let mut active: payment_transaction::ActiveModel = transaction.into();
        active.status = Set(PaymentStatus::Refunded);
        active.refund_amount = Set(Some(amount));
        active.refunded_at = Set(Some(now.into()));
        active.update(db).await?;
    }

    Ok(refunded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ride::tests::ride_with_seats;
    use crate::domain::Booking;

    #[test]
    fn test_entry_charges_price_per_seat() {
        let mut ride = ride_with_seats(4);
        let mut booking = Booking::confirmed(Uuid::new_v4(), 3, Utc::now());
        booking.payment_status = PaymentStatus::Completed;
        booking.payment_id = Some("pay_42".to_string());
        ride.add_passenger(booking.clone());

        let entry = NewTransaction::for_payment(&BookingOutcome { booking: booking.clone(), ride })
            .unwrap();
        assert_eq!(entry.amount, 300.0);
        assert_eq!(entry.seats_booked, 3);
        assert_eq!(entry.payment_id, "pay_42");
        assert_eq!(entry.user_id, booking.user_id);
    }

    #[test]
    fn test_no_entry_without_payment_id() {
        let mut ride = ride_with_seats(2);
        let booking = Booking::confirmed(Uuid::new_v4(), 1, Utc::now());
        ride.add_passenger(booking.clone());

        assert!(NewTransaction::for_payment(&BookingOutcome { booking, ride }).is_none());
    }
}
