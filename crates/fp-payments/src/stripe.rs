//! Stripe Checkout over the REST API (form-encoded requests).

use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    CheckoutRequest, CheckoutSession, ConfirmRequest, ConfirmedPayment, PaymentError,
    PaymentProvider, RefundRequest,
};

pub struct StripeProvider {
    api_base: String,
    secret_key: Option<String>,
    product_name: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for StripeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeProvider")
            .field("api_base", &self.api_base)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl StripeProvider {
    pub fn new(api_base: String, secret_key: Option<String>, product_name: String) -> Self {
        Self {
            api_base,
            secret_key,
            product_name,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    fn key(&self) -> Result<&str, PaymentError> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| PaymentError::Config("Stripe secret key is not set".to_string()))
    }

    /// Form fields for `POST /v1/checkout/sessions`.
    fn checkout_form(&self, req: &CheckoutRequest) -> Vec<(String, String)> {
        let li = "line_items[0]";
        let mut form = vec![
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("mode".to_string(), "payment".to_string()),
            (
                format!("{li}[price_data][currency]"),
                req.currency.to_ascii_lowercase(),
            ),
            (
                format!("{li}[price_data][product_data][name]"),
                self.product_name.clone(),
            ),
            (
                format!("{li}[price_data][product_data][description]"),
                format!("Order #{}", req.order_number),
            ),
            (
                format!("{li}[price_data][unit_amount]"),
                req.amount.to_string(),
            ),
            (format!("{li}[quantity]"), "1".to_string()),
            ("success_url".to_string(), req.success_url.clone()),
            ("cancel_url".to_string(), req.cancel_url.clone()),
            ("client_reference_id".to_string(), req.order_id.to_string()),
            ("metadata[orderId]".to_string(), req.order_id.to_string()),
            ("metadata[userId]".to_string(), req.user_id.to_string()),
            ("metadata[productTitle]".to_string(), req.product_title.clone()),
            ("metadata[termMonths]".to_string(), req.term_months.to_string()),
        ];
        if let Some(email) = &req.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        form
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    payment_status: Option<String>,
    payment_intent: Option<Value>,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
}

/// `payment_intent` is an id string unless expanded into an object.
pub(crate) fn payment_intent_id(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, PaymentError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<StripeErrorBody>(&body) {
        Ok(b) => match (b.error.code, b.error.message) {
            (Some(c), Some(m)) => format!("{c}: {m}"),
            (_, Some(m)) => m,
            (Some(c), None) => c,
            (None, None) => "unknown".to_string(),
        },
        Err(_) => body,
    };
    Err(PaymentError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait::async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_checkout(&self, req: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let resp = self
            .http
            .post(self.url("/v1/checkout/sessions"))
            .bearer_auth(self.key()?)
            // Retrying the same order never opens a second session.
            .header("Idempotency-Key", format!("checkout-{}", req.order_id))
            .form(&self.checkout_form(req))
            .send()
            .await?;
        let session: SessionResponse = check(resp).await?.json().await?;

        info!(order_id = %req.order_id, session_id = %session.id, "stripe checkout session created");
        Ok(CheckoutSession {
            session_id: session.id,
            session_url: session.url,
            client_params: None,
        })
    }

    async fn confirm_payment(&self, req: &ConfirmRequest) -> Result<ConfirmedPayment, PaymentError> {
        let resp = self
            .http
            .get(self.url(&format!("/v1/checkout/sessions/{}", req.reference)))
            .bearer_auth(self.key()?)
            .send()
            .await?;
        let session: SessionResponse = check(resp).await?.json().await?;

        let status = session.payment_status.unwrap_or_default();
        if status != "paid" {
            return Err(PaymentError::NotPaid(format!(
                "session {} payment_status={}",
                session.id, status
            )));
        }

        Ok(ConfirmedPayment {
            payment_intent_id: payment_intent_id(session.payment_intent.as_ref()),
            order_id: session
                .metadata
                .get("orderId")
                .and_then(|s| Uuid::parse_str(s).ok()),
        })
    }

    async fn refund(&self, req: &RefundRequest) -> Result<(), PaymentError> {
        let form = [
            ("payment_intent", req.payment_intent_id.as_str()),
            ("reason", "requested_by_customer"),
            ("metadata[reason]", req.reason.as_str()),
        ];
        let resp = self
            .http
            .post(self.url("/v1/refunds"))
            .bearer_auth(self.key()?)
            .form(&form)
            .send()
            .await?;
        check(resp).await?;
        info!(payment_intent = %req.payment_intent_id, "stripe refund created");
        Ok(())
    }
}
