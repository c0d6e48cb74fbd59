//! Transactional email over the Resend REST API.
//!
//! Sending is always best effort: callers log failures and carry on.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { id: String },
    /// No provider configured.
    Skipped,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, email: &Email) -> Result<SendOutcome>;
}

/// Used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMailer;

#[async_trait::async_trait]
impl Mailer for DisabledMailer {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn send(&self, email: &Email) -> Result<SendOutcome> {
        warn!(subject = %email.subject, "email provider not configured; skipping send");
        Ok(SendOutcome::Skipped)
    }
}

pub struct ResendMailer {
    api_base: String,
    api_key: String,
    from: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendMailer")
            .field("api_base", &self.api_base)
            .field("from", &self.from)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

#[derive(Serialize)]
struct SendBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

impl ResendMailer {
    pub fn new(api_base: String, api_key: String, from: String) -> Self {
        Self {
            api_base,
            api_key,
            from,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for ResendMailer {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, email: &Email) -> Result<SendOutcome> {
        let url = format!("{}/emails", self.api_base.trim_end_matches('/'));
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&SendBody {
                from: &self.from,
                to: [&email.to],
                subject: &email.subject,
                html: &email.html,
            })
            .send()
            .await
            .context("resend request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("resend rejected email status={} body={}", status.as_u16(), body);
        }
        let sent: SendResponse = resp.json().await.context("resend response decode failed")?;
        info!(email_id = %sent.id, subject = %email.subject, "email sent");
        Ok(SendOutcome::Sent { id: sent.id })
    }
}

/// Pick the mailer for the resolved API key.
pub fn build_mailer(
    settings: &fp_config::settings::EmailSettings,
    api_key: Option<&str>,
) -> std::sync::Arc<dyn Mailer> {
    match api_key.filter(|k| !k.trim().is_empty()) {
        Some(key) => std::sync::Arc::new(ResendMailer::new(
            settings.api_base.clone(),
            key.to_string(),
            settings.from.clone(),
        )),
        None => std::sync::Arc::new(DisabledMailer),
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `2000000` → `2,000,000`.
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if amount < 0 {
        out.insert(0, '-');
    }
    out
}

fn base(app_url: &str) -> String {
    escape_html(app_url.trim_end_matches('/'))
}

pub fn welcome(to: &str, name: &str, app_url: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "FanPlace에 오신 것을 환영합니다!".to_string(),
        html: format!(
            r#"<!DOCTYPE html>
<html>
  <head><meta charset="utf-8"></head>
  <body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 30px; text-align: center; border-radius: 10px 10px 0 0;">
      <h1 style="color: white; margin: 0;">FanPlace</h1>
    </div>
    <div style="background: #f9fafb; padding: 30px; border-radius: 0 0 10px 10px;">
      <h2>안녕하세요, {name}님!</h2>
      <p>FanPlace 회원가입을 완료했습니다.</p>
      <p>이제 팬 이벤트를 등록하고, 장소를 예약하고, 광고를 집행할 수 있습니다.</p>
      <div style="text-align: center; margin: 30px 0;">
        <a href="{url}" style="background: #667eea; color: white; padding: 12px 30px; text-decoration: none; border-radius: 6px; display: inline-block;">지금 시작하기</a>
      </div>
    </div>
  </body>
</html>"#,
            name = escape_html(name),
            url = base(app_url),
        ),
    }
}

pub fn receipt(to: &str, order_number: &str, amount: i64, product_title: &str, app_url: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("[FanPlace] 결제 영수증 ({order_number})"),
        html: format!(
            r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #667eea;">결제가 완료되었습니다</h1>
    <div style="background: #f9fafb; padding: 20px; border-radius: 8px; margin: 20px 0;">
      <p><strong>주문번호:</strong> {order}</p>
      <p><strong>상품:</strong> {product}</p>
      <p><strong>결제금액:</strong> {amount}원</p>
    </div>
    <p><a href="{url}/ko/account" style="color: #667eea;">주문 내역 확인하기 →</a></p>
  </body>
</html>"#,
            order = escape_html(order_number),
            product = escape_html(product_title),
            amount = format_amount(amount),
            url = base(app_url),
        ),
    }
}

pub fn password_reset(to: &str, token: &str, app_url: &str) -> Email {
    let reset_url = format!(
        "{}/ko/auth/reset-password?token={}",
        app_url.trim_end_matches('/'),
        token
    );
    Email {
        to: to.to_string(),
        subject: "[FanPlace] 비밀번호 재설정".to_string(),
        html: format!(
            r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1>비밀번호 재설정</h1>
    <p>아래 링크를 클릭하여 비밀번호를 재설정하세요:</p>
    <div style="margin: 30px 0;">
      <a href="{url}" style="background: #667eea; color: white; padding: 12px 30px; text-decoration: none; border-radius: 6px; display: inline-block;">비밀번호 재설정하기</a>
    </div>
    <p style="color: #6b7280; font-size: 14px;">이 링크는 1시간 동안 유효합니다.<br>요청하지 않았다면 이 메일을 무시하세요.</p>
  </body>
</html>"#,
            url = escape_html(&reset_url),
        ),
    }
}

pub fn event_approved(to: &str, event_title: &str, app_url: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "[FanPlace] 이벤트가 승인되었습니다".to_string(),
        html: format!(
            r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #10b981;">이벤트 승인 완료!</h1>
    <p>'{title}' 이벤트가 관리자 승인을 완료했습니다.</p>
    <p>이제 메인 페이지에 표시됩니다.</p>
    <a href="{url}/ko/account" style="color: #667eea;">내 계정에서 확인하기 →</a>
  </body>
</html>"#,
            title = escape_html(event_title),
            url = base(app_url),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_get_thousands_separators() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1_000), "1,000");
        assert_eq!(format_amount(2_000_000), "2,000,000");
        assert_eq!(format_amount(-15_000), "-15,000");
    }

    #[test]
    fn templates_escape_user_text() {
        let e = welcome("a@b.c", "<script>alert(1)</script>", "https://fanplace.com/");
        assert!(!e.html.contains("<script>"));
        assert!(e.html.contains("&lt;script&gt;"));
        assert!(e.html.contains(r#"href="https://fanplace.com""#));

        let e = event_approved("a@b.c", "IU & 팬들", "https://fanplace.com");
        assert!(e.html.contains("'IU &amp; 팬들'"));
    }

    #[test]
    fn receipt_subject_and_amount() {
        let e = receipt("a@b.c", "ORD-1", 500_000, "SNS 광고 패키지", "https://fanplace.com");
        assert_eq!(e.subject, "[FanPlace] 결제 영수증 (ORD-1)");
        assert!(e.html.contains("500,000원"));
    }

    #[test]
    fn reset_link_carries_token() {
        let e = password_reset("a@b.c", "tok123", "http://localhost:3000");
        assert_eq!(e.subject, "[FanPlace] 비밀번호 재설정");
        assert!(e.html.contains("http://localhost:3000/ko/auth/reset-password?token=tok123"));
    }

    #[tokio::test]
    async fn disabled_mailer_skips() {
        let out = DisabledMailer.send(&welcome("a@b.c", "n", "x")).await.unwrap();
        assert_eq!(out, SendOutcome::Skipped);
    }

    #[test]
    fn build_mailer_without_key_is_disabled() {
        let settings = fp_config::settings::EmailSettings::default();
        assert_eq!(build_mailer(&settings, None).name(), "disabled");
        assert_eq!(build_mailer(&settings, Some(" ")).name(), "disabled");
        assert_eq!(build_mailer(&settings, Some("re_123")).name(), "resend");
    }
}
