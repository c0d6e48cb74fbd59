//! Toss Payments. Checkout happens in the client widget; the server only
//! confirms, looks up and cancels payments.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    CheckoutRequest, CheckoutSession, ConfirmRequest, ConfirmedPayment, PaymentError,
    PaymentProvider, RefundRequest,
};

pub struct TossProvider {
    api_base: String,
    secret_key: Option<String>,
    http: reqwest::Client,
}

impl std::fmt::Debug for TossProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TossProvider")
            .field("api_base", &self.api_base)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TossPayment {
    pub payment_key: String,
    pub order_id: String,
    pub status: String,
    pub total_amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmBody<'a> {
    payment_key: &'a str,
    order_id: &'a str,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct TossErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// `Basic base64("<secret>:")`; the password half is always empty.
pub(crate) fn basic_auth(secret: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{secret}:"));
    format!("Basic {encoded}")
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, PaymentError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<TossErrorBody>(&body) {
        Ok(TossErrorBody {
            code: Some(c),
            message: Some(m),
        }) => format!("{c}: {m}"),
        Ok(TossErrorBody {
            message: Some(m), ..
        }) => m,
        _ => body,
    };
    Err(PaymentError::Api {
        status: status.as_u16(),
        message,
    })
}

impl TossProvider {
    pub fn new(api_base: String, secret_key: Option<String>) -> Self {
        Self {
            api_base,
            secret_key,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    fn auth(&self) -> Result<String, PaymentError> {
        self.secret_key
            .as_deref()
            .map(basic_auth)
            .ok_or_else(|| PaymentError::Config("Toss secret key is not set".to_string()))
    }

    /// Look up a payment by its key.
    pub async fn get_payment(&self, payment_key: &str) -> Result<TossPayment, PaymentError> {
        let resp = self
            .http
            .get(self.url(&format!("/v1/payments/{payment_key}")))
            .header(reqwest::header::AUTHORIZATION, self.auth()?)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }
}

#[async_trait::async_trait]
impl PaymentProvider for TossProvider {
    fn name(&self) -> &'static str {
        "toss"
    }

    async fn create_checkout(&self, req: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        // Fails early so a misconfigured server never hands out widget params.
        self.auth()?;
        Ok(CheckoutSession {
            session_id: req.order_number.clone(),
            session_url: None,
            client_params: Some(json!({
                "orderId": req.order_number,
                "orderName": req.product_title,
                "amount": req.amount,
                "customerEmail": req.customer_email,
                "successUrl": req.success_url,
                "failUrl": req.cancel_url,
            })),
        })
    }

    async fn confirm_payment(&self, req: &ConfirmRequest) -> Result<ConfirmedPayment, PaymentError> {
        let body = ConfirmBody {
            payment_key: &req.reference,
            order_id: &req.order_number,
            amount: req.amount,
        };
        let resp = self
            .http
            .post(self.url("/v1/payments/confirm"))
            .header(reqwest::header::AUTHORIZATION, self.auth()?)
            .json(&body)
            .send()
            .await?;
        let payment: TossPayment = check(resp).await?.json().await?;

        if payment.status != "DONE" {
            return Err(PaymentError::NotPaid(format!(
                "toss payment {} status={}",
                payment.payment_key, payment.status
            )));
        }
        if payment.total_amount != req.amount {
            return Err(PaymentError::NotPaid(format!(
                "toss amount mismatch expected={} got={}",
                req.amount, payment.total_amount
            )));
        }

        info!(order_number = %req.order_number, "toss payment confirmed");
        Ok(ConfirmedPayment {
            payment_intent_id: Some(payment.payment_key),
            order_id: None,
        })
    }

    async fn refund(&self, req: &RefundRequest) -> Result<(), PaymentError> {
        let resp = self
            .http
            .post(self.url(&format!("/v1/payments/{}/cancel", req.payment_intent_id)))
            .header(reqwest::header::AUTHORIZATION, self.auth()?)
            .json(&json!({ "cancelReason": req.reason }))
            .send()
            .await?;
        check(resp).await?;
        info!(payment_key = %req.payment_intent_id, "toss payment cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_has_empty_password() {
        // base64("test_sk:") == "dGVzdF9zazo="
        assert_eq!(basic_auth("test_sk"), "Basic dGVzdF9zazo=");
    }

    #[tokio::test]
    async fn checkout_without_key_is_config_error() {
        let p = TossProvider::new("http://127.0.0.1:1".into(), None);
        let req = CheckoutRequest {
            order_id: uuid::Uuid::nil(),
            order_number: "ORD-1".into(),
            user_id: uuid::Uuid::nil(),
            amount: 1000,
            currency: "KRW".into(),
            product_title: "t".into(),
            term_months: 1,
            customer_email: None,
            success_url: "s".into(),
            cancel_url: "c".into(),
        };
        assert!(matches!(
            p.create_checkout(&req).await,
            Err(PaymentError::Config(_))
        ));
    }
}
