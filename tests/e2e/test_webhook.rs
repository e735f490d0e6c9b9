use crate::e2e::helpers;

use chrono::{Duration, Utc};
use helpers::TestContext;
use hyper::StatusCode;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use test_context::test_context;

const WEBHOOK_PATH: &str = "/api/webhooks/paypal";

fn transmission_headers() -> [(&'static str, &'static str); 5] {
    [
        ("paypal-transmission-id", "tx-e2e-1"),
        ("paypal-transmission-time", "2025-06-01T12:00:00Z"),
        ("paypal-transmission-sig", "c2lnbmF0dXJl"),
        ("paypal-cert-url", "https://api.paypal.com/certs/CERT-1"),
        ("paypal-auth-algo", "SHA256withRSA"),
    ]
}

fn capture_event(event_id: &str, event_type: &str, order_id: &str) -> Value {
    json!({
        "id": event_id,
        "event_type": event_type,
        "resource_type": "capture",
        "resource": {
            "id": format!("CAPTURE-{}", order_id),
            "status": "COMPLETED",
            "supplementary_data": { "related_ids": { "order_id": order_id } }
        }
    })
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_credit_deposit_on_capture_completed(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("hooked@example.com").await.unwrap();
    ctx.fixtures
        .create_pending_deposit(user.id, Decimal::new(40, 0), "O-HOOK-1")
        .await
        .unwrap();

    let response = ctx
        .client
        .post_with_headers(
            WEBHOOK_PATH,
            &capture_event("WH-EVT-1", "PAYMENT.CAPTURE.COMPLETED", "O-HOOK-1"),
            &transmission_headers(),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("processed"), true);
    assert_eq!(response.field("eventId"), "WH-EVT-1");

    assert_eq!(ctx.fixtures.get_balance(user.id).await.unwrap(), Decimal::new(40, 0));
    assert_eq!(
        ctx.fixtures.get_transaction_status("O-HOOK-1").await.unwrap().as_deref(),
        Some("completed")
    );
    assert_eq!(ctx.fixtures.count_webhook_events("WH-EVT-1").await.unwrap(), 1);
    assert_eq!(ctx.gateway.count("verify_webhook_signature:tx-e2e-1"), 1);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_ignore_redelivered_events(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("redelivery@example.com").await.unwrap();
    ctx.fixtures
        .create_pending_deposit(user.id, Decimal::new(10, 0), "O-HOOK-2")
        .await
        .unwrap();
    let event = capture_event("WH-EVT-2", "PAYMENT.CAPTURE.COMPLETED", "O-HOOK-2");

    for _ in 0..2 {
        ctx.client
            .post_with_headers(WEBHOOK_PATH, &event, &transmission_headers())
            .await
            .unwrap()
            .assert_status(StatusCode::OK);
    }

    let third = ctx
        .client
        .post_with_headers(WEBHOOK_PATH, &event, &transmission_headers())
        .await
        .unwrap();

    third.assert_status(StatusCode::OK);
    assert_eq!(third.field("processed"), false);
    assert_eq!(third.field("message"), "Event already processed");
    assert_eq!(ctx.fixtures.get_balance(user.id).await.unwrap(), Decimal::new(10, 0));
    assert_eq!(ctx.fixtures.count_webhook_events("WH-EVT-2").await.unwrap(), 1);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_invalid_signatures(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("forged@example.com").await.unwrap();
    ctx.fixtures
        .create_pending_deposit(user.id, Decimal::new(10, 0), "O-FORGED")
        .await
        .unwrap();
    ctx.gateway.reject_signatures();

    let response = ctx
        .client
        .post_with_headers(
            WEBHOOK_PATH,
            &capture_event("WH-FORGED", "PAYMENT.CAPTURE.COMPLETED", "O-FORGED"),
            &transmission_headers(),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Invalid webhook signature");
    assert_eq!(ctx.fixtures.get_balance(user.id).await.unwrap(), Decimal::ZERO);
    assert_eq!(ctx.fixtures.count_webhook_events("WH-FORGED").await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_fail_deposit_on_denied_capture(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("denied@example.com").await.unwrap();
    ctx.fixtures
        .create_pending_deposit(user.id, Decimal::new(10, 0), "O-DENIED")
        .await
        .unwrap();

    let response = ctx
        .client
        .post_with_headers(
            WEBHOOK_PATH,
            &capture_event("WH-DENIED", "PAYMENT.CAPTURE.DENIED", "O-DENIED"),
            &transmission_headers(),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(
        ctx.fixtures.get_transaction_status("O-DENIED").await.unwrap().as_deref(),
        Some("failed")
    );
    assert_eq!(ctx.fixtures.get_balance(user.id).await.unwrap(), Decimal::ZERO);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_activate_subscription_from_webhook(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("activated@example.com").await.unwrap();
    ctx.fixtures
        .create_subscription(user.id, "free", "pending", Some("I-HOOKED"), None)
        .await
        .unwrap();
    let next_billing = (Utc::now() + Duration::days(30)).to_rfc3339();

    let response = ctx
        .client
        .post_with_headers(
            WEBHOOK_PATH,
            &json!({
                "id": "WH-ACT-1",
                "event_type": "BILLING.SUBSCRIPTION.ACTIVATED",
                "resource_type": "subscription",
                "resource": {
                    "id": "I-HOOKED",
                    "plan_id": "P-ENTERPRISE",
                    "status": "ACTIVE",
                    "billing_info": { "next_billing_time": next_billing }
                }
            }),
            &transmission_headers(),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("processed"), true);

    let stored = ctx.fixtures.get_subscription(user.id).await.unwrap().unwrap();
    assert_eq!(stored.tier, "enterprise");
    assert_eq!(stored.status, "active");
    assert!(stored.current_period_end.unwrap() > Utc::now() + Duration::days(29));
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_settle_subscription_cancelled_at_provider(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("cancelled@example.com").await.unwrap();
    ctx.fixtures
        .create_subscription(
            user.id,
            "pro",
            "active",
            Some("I-GONE"),
            Some(Utc::now() + Duration::days(12)),
        )
        .await
        .unwrap();

    let response = ctx
        .client
        .post_with_headers(
            WEBHOOK_PATH,
            &json!({
                "id": "WH-CAN-1",
                "event_type": "BILLING.SUBSCRIPTION.CANCELLED",
                "resource_type": "subscription",
                "resource": { "id": "I-GONE", "status": "CANCELLED" }
            }),
            &transmission_headers(),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);

    let stored = ctx.fixtures.get_subscription(user.id).await.unwrap().unwrap();
    assert_eq!(stored.tier, "free");
    assert_eq!(stored.status, "active");
    assert_eq!(stored.paypal_subscription_id, None);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_record_unhandled_event_types(ctx: &TestContext) {
    let response = ctx
        .client
        .post_with_headers(
            WEBHOOK_PATH,
            &json!({
                "id": "WH-OTHER-1",
                "event_type": "CUSTOMER.DISPUTE.CREATED",
                "resource": { "id": "PP-D-1" }
            }),
            &transmission_headers(),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("processed"), false);
    assert_eq!(ctx.fixtures.count_webhook_events("WH-OTHER-1").await.unwrap(), 1);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_payloads_without_event_id(ctx: &TestContext) {
    let response = ctx
        .client
        .post_with_headers(
            WEBHOOK_PATH,
            &json!({ "event_type": "PAYMENT.CAPTURE.COMPLETED", "resource": {} }),
            &transmission_headers(),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Invalid webhook payload");
}
