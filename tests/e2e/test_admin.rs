use crate::e2e::helpers;

use chrono::{Duration, Utc};
use helpers::{decimal, generate_test_jwt, TestContext};
use hyper::StatusCode;
use rust_decimal::Decimal;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_forbid_admin_routes_for_regular_users(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("user@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    for path in ["/api/admin/subscriptions", "/api/admin/transactions", "/api/admin/usage"] {
        let response = ctx.client.get_with_auth(path, &token).await.unwrap();

        response
            .assert_status(StatusCode::FORBIDDEN)
            .assert_error_message("Admin access required");
    }
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_require_authentication_before_role_check(ctx: &TestContext) {
    let response = ctx.client.get("/api/admin/subscriptions").await.unwrap();

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_list_and_filter_subscriptions(ctx: &TestContext) {
    let admin = ctx.fixtures.create_admin("admin@example.com").await.unwrap();
    let token = generate_test_jwt(&admin.id, &ctx.config.jwt_secret);

    let pro = ctx.fixtures.create_user("pro@example.com").await.unwrap();
    let basic = ctx.fixtures.create_user("basic@example.com").await.unwrap();
    let period_end = Some(Utc::now() + Duration::days(15));
    ctx.fixtures
        .create_subscription(pro.id, "pro", "active", Some("I-PRO"), period_end)
        .await
        .unwrap();
    ctx.fixtures
        .create_subscription(basic.id, "basic", "active", Some("I-BASIC"), period_end)
        .await
        .unwrap();

    let all = ctx
        .client
        .get_with_auth("/api/admin/subscriptions", &token)
        .await
        .unwrap();

    all.assert_status(StatusCode::OK);
    assert_eq!(all.field("total"), 2);
    assert_eq!(all.field("limit"), 50);

    let filtered = ctx
        .client
        .get_with_auth("/api/admin/subscriptions?tier=pro", &token)
        .await
        .unwrap();

    filtered.assert_status(StatusCode::OK);
    assert_eq!(filtered.field("total"), 1);
    let subscriptions = filtered.field("subscriptions");
    assert_eq!(subscriptions[0]["email"], "pro@example.com");
    assert_eq!(subscriptions[0]["tier"], "pro");
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_invalid_filters(ctx: &TestContext) {
    let admin = ctx.fixtures.create_admin("admin@example.com").await.unwrap();
    let token = generate_test_jwt(&admin.id, &ctx.config.jwt_secret);

    let response = ctx
        .client
        .get_with_auth("/api/admin/subscriptions?tier=platinum", &token)
        .await
        .unwrap();
    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Invalid tier: platinum");

    let response = ctx
        .client
        .get_with_auth("/api/admin/transactions?limit=0", &token)
        .await
        .unwrap();
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = ctx
        .client
        .get_with_auth("/api/admin/usage?days=1000", &token)
        .await
        .unwrap();
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_list_transactions_by_status(ctx: &TestContext) {
    let admin = ctx.fixtures.create_admin("admin@example.com").await.unwrap();
    let token = generate_test_jwt(&admin.id, &ctx.config.jwt_secret);
    let user = ctx.fixtures.create_user("payer@example.com").await.unwrap();
    ctx.fixtures
        .create_pending_deposit(user.id, Decimal::new(20, 0), "O-ADMIN-1")
        .await
        .unwrap();
    ctx.fixtures
        .create_pending_deposit(user.id, Decimal::new(30, 0), "O-ADMIN-2")
        .await
        .unwrap();

    let response = ctx
        .client
        .get_with_auth("/api/admin/transactions?status=pending&limit=1", &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("total"), 2);
    let transactions = response.field("transactions");
    assert_eq!(transactions.as_array().unwrap().len(), 1);
    assert_eq!(transactions[0]["email"], "payer@example.com");

    let completed = ctx
        .client
        .get_with_auth("/api/admin/transactions?status=completed", &token)
        .await
        .unwrap();
    assert_eq!(completed.field("total"), 0);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_aggregate_usage_across_users(ctx: &TestContext) {
    let admin = ctx.fixtures.create_admin("admin@example.com").await.unwrap();
    let token = generate_test_jwt(&admin.id, &ctx.config.jwt_secret);
    let first = ctx.fixtures.create_user("first@example.com").await.unwrap();
    let second = ctx.fixtures.create_user("second@example.com").await.unwrap();
    let today = Utc::now().date_naive();
    ctx.fixtures.add_usage(first.id, "compress", today, 4).await.unwrap();
    ctx.fixtures.add_usage(second.id, "compress", today, 6).await.unwrap();
    ctx.fixtures.add_usage(second.id, "ocr", today, 1).await.unwrap();
    // Outside the default window
    ctx.fixtures
        .add_usage(first.id, "ocr", today - Duration::days(90), 100)
        .await
        .unwrap();

    let response = ctx
        .client
        .get_with_auth("/api/admin/usage", &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("totalOperations"), 11);

    let operations = response.field("operations");
    let compress = operations
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["operation"] == "compress")
        .expect("compress totals missing");
    assert_eq!(compress["count"], 10);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_search_the_activity_feed(ctx: &TestContext) {
    let admin = ctx.fixtures.create_admin("admin@example.com").await.unwrap();
    let token = generate_test_jwt(&admin.id, &ctx.config.jwt_secret);
    let ana = ctx.fixtures.create_user("ana@example.com").await.unwrap();
    let bob = ctx.fixtures.create_user("bob@example.com").await.unwrap();
    ctx.fixtures
        .create_pending_deposit(ana.id, Decimal::new(20, 0), "O-FEED-1")
        .await
        .unwrap();
    ctx.fixtures
        .create_pending_deposit(bob.id, Decimal::new(30, 0), "O-FEED-2")
        .await
        .unwrap();
    let today = Utc::now().date_naive();
    ctx.fixtures.add_usage(ana.id, "merge", today, 2).await.unwrap();

    let response = ctx
        .client
        .get_with_auth("/api/admin/activity?search=ANA&timeRange=7d", &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("total"), 2);
    assert_eq!(response.field("timeRange"), "7d");
    let stats = response.field("stats");
    assert_eq!(stats["byType"]["transaction"], 1);
    assert_eq!(stats["byType"]["usage"], 1);
    assert_eq!(stats["byStatus"]["warning"], 1);
    for entry in response.field("activities").as_array().unwrap() {
        assert_eq!(entry["userEmail"], "ana@example.com");
    }

    let invalid = ctx
        .client
        .get_with_auth("/api/admin/activity?timeRange=2w", &token)
        .await
        .unwrap();
    invalid
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Invalid timeRange: 2w");
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_summarize_the_ledger(ctx: &TestContext) {
    let admin = ctx.fixtures.create_admin("admin@example.com").await.unwrap();
    let token = generate_test_jwt(&admin.id, &ctx.config.jwt_secret);
    let user = ctx.fixtures.create_user("ledger@example.com").await.unwrap();
    ctx.fixtures
        .add_completed_transaction(user.id, Decimal::new(20, 0))
        .await
        .unwrap();
    ctx.fixtures
        .add_completed_transaction(user.id, Decimal::new(10, 0))
        .await
        .unwrap();
    ctx.fixtures
        .add_completed_transaction(user.id, Decimal::new(-5, 3))
        .await
        .unwrap();
    ctx.fixtures
        .create_pending_deposit(user.id, Decimal::new(99, 0), "O-STATS-1")
        .await
        .unwrap();

    let response = ctx
        .client
        .get_with_auth("/api/admin/transactions/stats", &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let overview = response.field("overview");
    assert_eq!(overview["total"], 3);
    assert_eq!(decimal(&overview["income"]), Decimal::new(30, 0));
    assert_eq!(decimal(&overview["averageDeposit"]), Decimal::new(15, 0));
    assert_eq!(overview["operationsToday"], 1);
    let trends = response.field("trends");
    let trends = trends.as_array().unwrap();
    assert_eq!(trends.len(), 14);
    assert_eq!(decimal(&trends[13]["income"]), Decimal::new(30, 0));
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_price_active_subscriptions_by_tier(ctx: &TestContext) {
    let admin = ctx.fixtures.create_admin("admin@example.com").await.unwrap();
    let token = generate_test_jwt(&admin.id, &ctx.config.jwt_secret);
    let period_end = Some(Utc::now() + Duration::days(15));
    for (email, tier, status) in [
        ("one@example.com", "pro", "active"),
        ("two@example.com", "pro", "active"),
        ("three@example.com", "basic", "canceled"),
    ] {
        let user = ctx.fixtures.create_user(email).await.unwrap();
        ctx.fixtures
            .create_subscription(user.id, tier, status, Some(email), period_end)
            .await
            .unwrap();
    }

    let response = ctx
        .client
        .get_with_auth("/api/admin/subscriptions/stats", &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let overview = response.field("overview");
    assert_eq!(overview["total"], 3);
    assert_eq!(overview["active"], 2);
    assert_eq!(overview["canceled"], 1);
    assert_eq!(decimal(&overview["revenue"]["monthly"]), Decimal::new(3998, 2));
    let by_tier = response.field("byTier");
    let basic = by_tier
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["tier"] == "basic")
        .expect("basic tier missing");
    assert_eq!(basic["count"], 0);
}
