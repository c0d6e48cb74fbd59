//! Upstash limiter counting and fail-open behavior.

use std::time::Duration;

use fp_config::secrets::UpstashCredentials;
use fp_providers::{RateLimiter, UpstashLimiter};
use serde_json::json;
use wiremock::matchers::{body_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn limiter(server: &MockServer) -> UpstashLimiter {
    UpstashLimiter::new(UpstashCredentials {
        url: server.uri(),
        token: "up_token".to_string(),
    })
}

#[tokio::test]
async fn first_hit_sets_expiry_and_is_allowed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer up_token"))
        .and(body_json(json!(["INCR", "rate_limit:signup:1.2.3.4"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!(["PEXPIRE", "rate_limit:signup:1.2.3.4", 60000])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!(["PTTL", "rate_limit:signup:1.2.3.4"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 60000})))
        .mount(&server)
        .await;

    let d = limiter(&server)
        .check("signup:1.2.3.4", 5, Duration::from_secs(60))
        .await;
    assert!(d.allowed);
    assert_eq!(d.limit, 5);
    assert_eq!(d.remaining, 4);
}

#[tokio::test]
async fn over_limit_is_denied_without_resetting_expiry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!(["INCR", "rate_limit:k"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 6})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!(["PEXPIRE", "rate_limit:k", 60000])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!(["PTTL", "rate_limit:k"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 30000})))
        .mount(&server)
        .await;

    let d = limiter(&server).check("k", 5, Duration::from_secs(60)).await;
    assert!(!d.allowed);
    assert_eq!(d.remaining, 0);
}

#[tokio::test]
async fn redis_errors_fail_open() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "WRONGPASS invalid token"})),
        )
        .mount(&server)
        .await;

    let d = limiter(&server).check("k", 5, Duration::from_secs(60)).await;
    assert!(d.allowed);
    assert_eq!(d.remaining, 5);
}

#[tokio::test]
async fn unreachable_redis_fails_open() {
    let l = UpstashLimiter::new(UpstashCredentials {
        url: "http://127.0.0.1:1".to_string(),
        token: "t".to_string(),
    });
    let d = l.check("k", 2, Duration::from_secs(10)).await;
    assert!(d.allowed);
}

#[tokio::test]
async fn counter_without_expiry_is_rearmed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!(["INCR", "rate_limit:stuck"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 9})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!(["PTTL", "rate_limit:stuck"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": -1})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!(["PEXPIRE", "rate_limit:stuck", 60000])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let before = chrono::Utc::now().timestamp_millis();
    let d = limiter(&server).check("stuck", 5, Duration::from_secs(60)).await;
    assert!(!d.allowed);
    assert!(d.reset_ms >= before + 60_000);
    assert!(d.retry_after_secs(before) <= 61);
}
