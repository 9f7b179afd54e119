//! Payment processor integration.
//!
//! Handlers only see the [`PaymentProcessor`] trait; [`StripeClient`] talks to the
//! Stripe REST API in production and tests plug in a fake.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;

/// Currency every intent is created in.
pub const CURRENCY: &str = "usd";

/// A payment intent as returned by the processor.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
}

/// External payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a card payment intent for `amount` minor units of `currency`.
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentIntent, AppError>;
}

/// Stripe client using the form-encoded REST API.
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentIntent, AppError> {
        let amount_field = amount.to_string();
        let form = [
            ("amount", amount_field.as_str()),
            ("currency", currency),
            ("payment_method_types[]", "card"),
        ];

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| format!("processor returned {}", status));
            tracing::warn!("Payment intent rejected ({}): {}", status, message);
            return Err(AppError::Payment(message));
        }

        let intent = response.json::<PaymentIntent>().await?;
        tracing::info!("Created payment intent {} for {} {}", intent.id, intent.amount, intent.currency);
        Ok(intent)
    }
}

/// Convert a client price in major units to integer minor units.
///
/// Accepts a JSON number or a numeric string. The result is rounded to the
/// nearest cent so that `19.99` becomes `1999` rather than `1998`.
pub fn price_to_minor_units(price: &Value) -> Result<i64, AppError> {
    let major = match price {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|p| p.is_finite())
    .ok_or_else(|| AppError::BadRequest("price must be a number".to_string()))?;

    let minor = (major * 100.0).round();
    if minor < 1.0 || minor > i64::MAX as f64 {
        return Err(AppError::Validation(
            "price must be a positive amount".to_string(),
        ));
    }

    Ok(minor as i64)
}
