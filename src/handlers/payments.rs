use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::payment_transaction;
use crate::error::{AppError, AppResult};
use crate::services::booking::BookingOutcome;
use crate::services::ledger::{self, NewTransaction, TransactionView};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub ride_id: Uuid,
    pub payment_id: String,
    pub seats_booked: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    #[serde(flatten)]
    pub outcome: BookingOutcome,
    /// `None` when the booking was saved but the ledger write failed
    pub transaction: Option<payment_transaction::Model>,
}

#[derive(Debug, Serialize)]
pub struct PaymentHistoryResponse {
    pub transactions: Vec<TransactionView>,
    pub count: usize,
}

/// Record a payment the gateway has already verified
pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<ConfirmPaymentResponse>> {
    let payment_id = payload.payment_id.trim().to_string();
    if payment_id.is_empty() {
        return Err(AppError::BadRequest("payment_id is required".to_string()));
    }

    let outcome = state
        .engine
        .confirm_payment(
            payload.ride_id,
            claims.sub,
            payment_id,
            payload.seats_booked.unwrap_or(1),
        )
        .await?;

    // Ledger failures are logged only
    let transaction = match NewTransaction::for_payment(&outcome) {
        Some(entry) => match ledger::record(&state.db, &entry, Utc::now()).await {
            Ok(transaction) => Some(transaction),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    ride_id = %entry.ride_id,
                    payment_id = %entry.payment_id,
                    "Payment confirmed but the transaction was not recorded"
                );
                None
            }
        },
        None => None,
    };

    Ok(Json(ConfirmPaymentResponse { outcome, transaction }))
}

/// The caller's latest transactions
pub async fn payment_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<PaymentHistoryResponse>> {
    let transactions = ledger::history(&state.db, claims.sub).await?;
    Ok(Json(PaymentHistoryResponse {
        count: transactions.len(),
        transactions,
    }))
}

/// One of the caller's transactions
pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Json<TransactionView>> {
    let transaction = ledger::find_for_user(&state.db, claims.sub, transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;
    Ok(Json(transaction))
}
