//! Payment provider boundary.
//!
//! The daemon talks to exactly one [`PaymentProvider`] chosen by
//! `payments.provider`. Adapters speak the provider's REST API over
//! `reqwest` and never log key material.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::Value;
use uuid::Uuid;

use fp_config::secrets::ResolvedSecrets;
use fp_config::settings::PaymentSettings;

pub mod stripe;
pub mod toss;
pub mod webhook;

pub use stripe::StripeProvider;
pub use toss::{TossPayment, TossProvider};

// ---------------------------------------------------------------------------
// Requests and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    /// Minor units. KRW has none, so this is whole won.
    pub amount: i64,
    pub currency: String,
    pub product_title: String,
    pub term_months: i32,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    /// Provider reference stored on the order.
    pub session_id: String,
    /// Hosted page to redirect the buyer to, when the provider has one.
    pub session_url: Option<String>,
    /// Parameters for a client-side widget, when the provider uses one.
    pub client_params: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    /// Stripe: checkout session id. Toss: paymentKey.
    pub reference: String,
    pub order_number: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedPayment {
    pub payment_intent_id: Option<String>,
    /// Order id echoed back from checkout metadata, if the provider keeps it.
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct RefundRequest {
    /// Stripe: payment intent. Toss: paymentKey.
    pub payment_intent_id: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment provider not configured: {0}")]
    Config(String),
    #[error("payment transport error: {0}")]
    Transport(String),
    #[error("payment provider error status={status}: {message}")]
    Api { status: u16, message: String },
    #[error("payment response decode error: {0}")]
    Decode(String),
    #[error("payment not completed: {0}")]
    NotPaid(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            PaymentError::Decode(e.to_string())
        } else {
            PaymentError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Object safe; the daemon holds an `Arc<dyn PaymentProvider>`.
#[async_trait::async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_checkout(&self, req: &CheckoutRequest) -> Result<CheckoutSession, PaymentError>;

    /// Succeeds only when the provider reports the payment as captured.
    async fn confirm_payment(&self, req: &ConfirmRequest) -> Result<ConfirmedPayment, PaymentError>;

    async fn refund(&self, req: &RefundRequest) -> Result<(), PaymentError>;
}

/// Build the configured provider. Missing keys are tolerated here and
/// surface as [`PaymentError::Config`] on first use; production startup
/// has already refused to boot without them.
pub fn build_provider(
    settings: &PaymentSettings,
    secrets: &ResolvedSecrets,
) -> Result<Arc<dyn PaymentProvider>> {
    match settings.provider.as_str() {
        "stripe" => Ok(Arc::new(StripeProvider::new(
            settings.stripe.api_base.clone(),
            secrets.stripe_secret_key.clone(),
            settings.stripe.product_name.clone(),
        ))),
        "toss" => Ok(Arc::new(TossProvider::new(
            settings.toss.api_base.clone(),
            secrets.toss_secret_key.clone(),
        ))),
        other => bail!("unknown payments.provider '{}'; expected stripe | toss", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_selects_by_name() {
        let secrets = ResolvedSecrets::development();
        let mut settings = PaymentSettings::default();
        assert_eq!(build_provider(&settings, &secrets).unwrap().name(), "stripe");

        settings.provider = "toss".to_string();
        assert_eq!(build_provider(&settings, &secrets).unwrap().name(), "toss");

        settings.provider = "paypal".to_string();
        let err = build_provider(&settings, &secrets).err().unwrap();
        assert!(err.to_string().contains("paypal"));
    }
}
