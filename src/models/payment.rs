//! Payment records and payment-intent requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{strip_reserved, Extra, UpdateResult};

/// A payment reported by the client after confirming it with the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Request body for recording a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentRequest {
    pub email: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl RecordPaymentRequest {
    pub fn sanitized_extra(&self) -> Extra {
        let mut extra = self.extra.clone();
        strip_reserved(&mut extra, &["_id"]);
        extra
    }
}

/// Request body for creating a payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentRequest {
    /// Price in major units, as a JSON number or numeric string
    #[serde(default)]
    pub price: Value,
}

/// Response body carrying the processor's client secret.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// A user's payment history together with the badge grant it triggered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistory {
    pub payments: Vec<Payment>,
    pub badge_update: UpdateResult,
}
