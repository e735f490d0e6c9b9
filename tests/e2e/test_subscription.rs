use crate::e2e::helpers;

use chrono::{Duration, Utc};
use helpers::{generate_test_jwt, TestContext};
use hyper::StatusCode;
use megapdf_billing::infrastructure::payments::SubscriptionCheck;
use serde_json::json;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_require_auth_for_subscription(ctx: &TestContext) {
    let response = ctx.client.get("/api/subscription").await.unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Missing authorization header");
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_tokens_for_unknown_users(ctx: &TestContext) {
    let token = generate_test_jwt(&uuid::Uuid::new_v4(), &ctx.config.jwt_secret);

    let response = ctx
        .client
        .get_with_auth("/api/subscription", &token)
        .await
        .unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("User not found");
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_create_free_subscription_on_first_read(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("reader@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    assert!(ctx.fixtures.get_subscription(user.id).await.unwrap().is_none());

    let response = ctx
        .client
        .get_with_auth("/api/subscription", &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let subscription = response.field("subscription");
    assert_eq!(subscription["tier"], "free");
    assert_eq!(subscription["effectiveTier"], "free");
    assert_eq!(subscription["status"], "active");

    let stored = ctx.fixtures.get_subscription(user.id).await.unwrap().unwrap();
    assert_eq!(stored.tier, "free");
    assert_eq!(stored.status, "active");
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_start_checkout_and_keep_current_tier(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("buyer@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    let response = ctx
        .client
        .post_with_auth("/api/subscription", &json!({ "tier": "pro" }), &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let subscription_id = response.field("subscriptionId").as_str().unwrap().to_string();
    assert!(response.field("checkoutUrl").as_str().unwrap().contains(&subscription_id));
    assert_eq!(response.field("subscription")["status"], "pending");
    assert_eq!(response.field("subscription")["tier"], "free");

    let stored = ctx.fixtures.get_subscription(user.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "pending");
    assert_eq!(stored.tier, "free");
    assert_eq!(stored.paypal_subscription_id.as_deref(), Some(subscription_id.as_str()));
    assert_eq!(ctx.gateway.count("create_subscription:P-PRO"), 1);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_second_checkout_while_pending(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("twice@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    ctx.client
        .post_with_auth("/api/subscription/upgrade", &json!({ "tier": "basic" }), &token)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let response = ctx
        .client
        .post_with_auth("/api/subscription/upgrade", &json!({ "tier": "enterprise" }), &token)
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("already pending");
    assert_eq!(ctx.gateway.count("create_subscription"), 1);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_unknown_tiers(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("tiers@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    for tier in ["platinum", "free"] {
        let response = ctx
            .client
            .post_with_auth("/api/subscription/upgrade", &json!({ "tier": tier }), &token)
            .await
            .unwrap();

        response
            .assert_status(StatusCode::BAD_REQUEST)
            .assert_error_message("Invalid subscription tier");
    }
    assert_eq!(ctx.gateway.count("create_subscription"), 0);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_activate_subscription_on_verify(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("verify@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    let checkout = ctx
        .client
        .post_with_auth("/api/subscription", &json!({ "tier": "pro" }), &token)
        .await
        .unwrap();
    let subscription_id = checkout.field("subscriptionId").as_str().unwrap().to_string();

    let period_end = Utc::now() + Duration::days(30);
    ctx.gateway.set_subscription(
        &subscription_id,
        SubscriptionCheck::Confirmed {
            plan_id: "P-PRO".to_string(),
            period_start: Some(Utc::now()),
            period_end: Some(period_end),
        },
    );

    let response = ctx
        .client
        .get_with_auth(
            &format!("/api/subscription/verify?subscription_id={}", subscription_id),
            &token,
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("success"), true);
    assert_eq!(response.field("message"), "Subscription activated");
    assert_eq!(response.field("subscription")["tier"], "pro");
    assert_eq!(response.field("subscription")["status"], "active");

    let stored = ctx.fixtures.get_subscription(user.id).await.unwrap().unwrap();
    assert_eq!(stored.tier, "pro");
    assert_eq!(stored.status, "active");
    assert!(stored.current_period_end.is_some());
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_leave_unapproved_checkout_pending(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("waiting@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    let checkout = ctx
        .client
        .post_with_auth("/api/subscription", &json!({ "tier": "basic" }), &token)
        .await
        .unwrap();
    let subscription_id = checkout.field("subscriptionId").as_str().unwrap().to_string();

    let response = ctx
        .client
        .get_with_auth(
            &format!("/api/subscription/verify?subscription_id={}", subscription_id),
            &token,
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("success"), false);
    assert_eq!(response.field("subscription")["status"], "pending");
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_verifying_foreign_subscription_id(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("foreign@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    ctx.client
        .post_with_auth("/api/subscription", &json!({ "tier": "pro" }), &token)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let response = ctx
        .client
        .get_with_auth("/api/subscription/verify?subscription_id=I-SOMEONE-ELSE", &token)
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("does not match");
    assert_eq!(ctx.gateway.count("get_subscription"), 0);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_settle_abandoned_checkout_when_verified_without_id(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("abandon@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    ctx.client
        .post_with_auth("/api/subscription", &json!({ "tier": "pro" }), &token)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let response = ctx
        .client
        .get_with_auth("/api/subscription/verify", &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("success"), false);
    assert_eq!(response.field("subscription")["tier"], "free");
    assert_eq!(response.field("subscription")["status"], "active");

    let stored = ctx.fixtures.get_subscription(user.id).await.unwrap().unwrap();
    assert_eq!(stored.paypal_subscription_id, None);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reset_pending_checkout(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("reset@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    ctx.client
        .post_with_auth("/api/subscription", &json!({ "tier": "enterprise" }), &token)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let response = ctx
        .client
        .post_with_auth("/api/subscription/reset-pending", &json!({}), &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("message"), "Pending subscription has been reset");

    let stored = ctx.fixtures.get_subscription(user.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "active");
    assert_eq!(stored.tier, "free");
    assert_eq!(stored.paypal_subscription_id, None);

    // A fresh checkout is allowed again
    ctx.client
        .post_with_auth("/api/subscription", &json!({ "tier": "basic" }), &token)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_cancel_paid_subscription_to_free(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("cancel@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);
    ctx.fixtures
        .create_subscription(
            user.id,
            "pro",
            "active",
            Some("I-PAID-1"),
            Some(Utc::now() + Duration::days(20)),
        )
        .await
        .unwrap();

    let response = ctx
        .client
        .post_with_auth("/api/subscription/cancel", &json!({}), &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("success"), true);
    assert_eq!(response.field("subscription")["tier"], "free");
    assert_eq!(ctx.gateway.count("cancel_subscription:I-PAID-1"), 1);

    let stored = ctx.fixtures.get_subscription(user.id).await.unwrap().unwrap();
    assert_eq!(stored.tier, "free");
    assert_eq!(stored.status, "active");
    assert_eq!(stored.paypal_subscription_id, None);
    assert!(stored.canceled_at.is_some());
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_refuse_checkout_while_paid_subscription_attached(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("attached@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);
    ctx.fixtures
        .create_subscription(
            user.id,
            "basic",
            "active",
            Some("I-PAID-2"),
            Some(Utc::now() + Duration::days(10)),
        )
        .await
        .unwrap();

    let response = ctx
        .client
        .post_with_auth("/api/subscription/upgrade", &json!({ "tier": "pro" }), &token)
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("cancel your existing subscription");
}
