use crate::e2e::helpers;

use chrono::{Duration, Utc};
use helpers::{TestContext, CRON_SECRET};
use hyper::StatusCode;
use serde_json::json;
use test_context::test_context;

const SECRET_HEADER: (&str, &str) = ("x-cron-secret", CRON_SECRET);

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_cron_without_secret(ctx: &TestContext) {
    let response = ctx.client.post("/api/cron/subscriptions", &json!({})).await.unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Invalid cron secret");
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_cron_with_wrong_secret(ctx: &TestContext) {
    let response = ctx
        .client
        .post_with_headers(
            "/api/cron/subscriptions",
            &json!({}),
            &[("x-cron-secret", "not-the-secret")],
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_accept_secret_as_bearer_token(ctx: &TestContext) {
    let bearer = format!("Bearer {}", CRON_SECRET);
    let response = ctx
        .client
        .get_with_headers("/api/cron/subscriptions", &[("Authorization", bearer.as_str())])
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("job"), "all");
    let results = response.field("results");
    assert!(results.get("expire").is_some());
    assert!(results.get("remind").is_some());
    assert!(results.get("resetUsage").is_some());
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_unknown_job(ctx: &TestContext) {
    let response = ctx
        .client
        .post_with_headers("/api/cron/subscriptions?job=launch", &json!({}), &[SECRET_HEADER])
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Unknown job");
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_expire_lapsed_paid_subscriptions(ctx: &TestContext) {
    let lapsed = ctx.fixtures.create_user("lapsed@example.com").await.unwrap();
    let current = ctx.fixtures.create_user("current@example.com").await.unwrap();
    ctx.fixtures
        .create_subscription(
            lapsed.id,
            "pro",
            "active",
            Some("I-LAPSED"),
            Some(Utc::now() - Duration::hours(1)),
        )
        .await
        .unwrap();
    ctx.fixtures
        .create_subscription(
            current.id,
            "basic",
            "active",
            Some("I-CURRENT"),
            Some(Utc::now() + Duration::days(20)),
        )
        .await
        .unwrap();

    let response = ctx
        .client
        .post_with_headers("/api/cron/subscriptions?job=expire", &json!({}), &[SECRET_HEADER])
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("results")["expire"]["expired"], 1);
    assert!(response.field("results").get("remind").is_none());

    let expired = ctx.fixtures.get_subscription(lapsed.id).await.unwrap().unwrap();
    assert_eq!(expired.status, "expired");
    assert_eq!(expired.tier, "free");
    assert_eq!(expired.paypal_subscription_id, None);

    let untouched = ctx.fixtures.get_subscription(current.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, "active");
    assert_eq!(untouched.tier, "basic");

    // Running again finds nothing to do
    let again = ctx
        .client
        .post_with_headers("/api/cron/subscriptions?job=expire", &json!({}), &[SECRET_HEADER])
        .await
        .unwrap();
    assert_eq!(again.field("results")["expire"]["expired"], 0);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_settle_stale_pending_checkouts(ctx: &TestContext) {
    let stale = ctx.fixtures.create_user("stale@example.com").await.unwrap();
    let fresh = ctx.fixtures.create_user("fresh@example.com").await.unwrap();
    for user in [&stale, &fresh] {
        ctx.fixtures
            .create_subscription(user.id, "free", "pending", Some("I-CHECKOUT"), None)
            .await
            .unwrap();
    }
    ctx.fixtures
        .set_subscription_updated_at(stale.id, Utc::now() - Duration::hours(25))
        .await
        .unwrap();

    let response = ctx
        .client
        .post_with_headers("/api/cron/subscriptions?job=expire", &json!({}), &[SECRET_HEADER])
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("results")["expire"]["staleCheckoutsSettled"], 1);

    let settled = ctx.fixtures.get_subscription(stale.id).await.unwrap().unwrap();
    assert_eq!(settled.status, "active");
    assert_eq!(settled.paypal_subscription_id, None);

    let still_pending = ctx.fixtures.get_subscription(fresh.id).await.unwrap().unwrap();
    assert_eq!(still_pending.status, "pending");
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_send_renewal_reminder_once_per_period(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("renewing@example.com").await.unwrap();
    ctx.fixtures
        .create_subscription(
            user.id,
            "enterprise",
            "active",
            Some("I-RENEW"),
            Some(Utc::now() + Duration::days(2)),
        )
        .await
        .unwrap();

    let response = ctx
        .client
        .post_with_headers("/api/cron/subscriptions?job=remind", &json!({}), &[SECRET_HEADER])
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("results")["remind"]["remindersSent"], 1);

    let stored = ctx.fixtures.get_subscription(user.id).await.unwrap().unwrap();
    assert!(stored.reminder_sent_at.is_some());

    let again = ctx
        .client
        .post_with_headers("/api/cron/subscriptions?job=remind", &json!({}), &[SECRET_HEADER])
        .await
        .unwrap();
    assert_eq!(again.field("results")["remind"]["remindersSent"], 0);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reset_usage_and_archive_counters(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("monthly@example.com").await.unwrap();
    ctx.fixtures
        .set_free_operations(user.id, 42, Utc::now() - Duration::hours(2))
        .await
        .unwrap();
    ctx.fixtures
        .create_subscription(user.id, "free", "active", None, None)
        .await
        .unwrap();
    ctx.fixtures
        .set_usage_reset_date(user.id, Utc::now() - Duration::hours(2))
        .await
        .unwrap();
    let yesterday = (Utc::now() - Duration::days(1)).date_naive();
    ctx.fixtures.add_usage(user.id, "compress", yesterday, 7).await.unwrap();
    ctx.fixtures.add_usage(user.id, "merge", yesterday, 2).await.unwrap();

    let response = ctx
        .client
        .post_with_headers(
            "/api/cron/subscriptions?job=reset-usage",
            &json!({}),
            &[SECRET_HEADER],
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let report = response.field("results")["resetUsage"].clone();
    assert_eq!(report["usersReset"], 1);
    assert_eq!(report["subscriptionsReset"], 1);
    assert_eq!(report["usageRowsArchived"], 2);

    assert_eq!(ctx.fixtures.get_free_operations_used(user.id).await.unwrap(), 0);
    assert_eq!(ctx.fixtures.count_usage_rows(user.id).await.unwrap(), 0);
    assert_eq!(ctx.fixtures.count_archived_usage_rows(user.id).await.unwrap(), 2);

    let stored = ctx.fixtures.get_subscription(user.id).await.unwrap().unwrap();
    assert!(stored.usage_reset_date > Utc::now());
}
