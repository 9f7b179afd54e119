//! Payment API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    Badge, InsertResult, PaymentHistory, PaymentIntentRequest, PaymentIntentResponse,
    RecordPaymentRequest,
};
use crate::payments::{price_to_minor_units, CURRENCY};
use crate::AppState;

/// POST /create-payment-intent - Start a card payment with the processor.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<PaymentIntentRequest>,
) -> ApiResult<PaymentIntentResponse> {
    let amount = price_to_minor_units(&request.price)?;

    let processor = state
        .payments
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Payments are not configured".to_string()))?;

    let intent = processor.create_payment_intent(amount, CURRENCY).await?;
    success(PaymentIntentResponse {
        client_secret: intent.client_secret,
    })
}

/// POST /payment - Record a payment the client confirmed with the processor.
pub async fn record_payment(
    State(state): State<AppState>,
    Json(request): Json<RecordPaymentRequest>,
) -> ApiResult<InsertResult> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    // The client's word is taken here; nothing is checked against the processor.
    let payment = state.repo.record_payment(&request).await?;
    tracing::info!("Recorded payment {} for {}", payment.id, payment.email);
    success(InsertResult::inserted(payment.id))
}

/// GET /payment/:email - Payment history; also grants the Gold badge.
pub async fn payment_history(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<PaymentHistory> {
    let payments = state.repo.list_payments_by_email(&email).await?;
    let badge_update = state.repo.grant_badge(&email, Badge::Gold).await?;

    success(PaymentHistory {
        payments,
        badge_update,
    })
}
