use crate::e2e::helpers;

use chrono::{Duration, Utc};
use helpers::{decimal, generate_test_jwt, TestContext};
use hyper::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_allow_operations_within_free_allowance(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("free@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    let response = ctx
        .client
        .post_with_auth("/api/operations/check", &json!({ "operationType": "compress" }), &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("canPerform"), true);
    assert_eq!(response.field("hasFreeOperations"), true);
    assert_eq!(response.field("freeOperationsRemaining"), 500);
    assert_eq!(response.field("operation"), "compress");
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_consume_free_operation_and_count_usage(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("consume@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    let response = ctx
        .client
        .post_with_auth("/api/operations/process", &json!({ "operationType": "merge" }), &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let operation = response.field("operation");
    assert_eq!(operation["type"], "merge");
    assert_eq!(operation["usedFreeOperation"], true);
    assert_eq!(response.field("account")["freeOperationsRemaining"], 499);

    assert_eq!(ctx.fixtures.get_free_operations_used(user.id).await.unwrap(), 1);
    assert_eq!(ctx.fixtures.get_usage_count(user.id, "merge").await.unwrap(), 1);
    assert_eq!(ctx.fixtures.get_balance(user.id).await.unwrap(), Decimal::ZERO);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_default_missing_operation_type_to_general(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("general@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    let response = ctx
        .client
        .post_with_auth("/api/operations/process", &json!({}), &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("operation")["type"], "general");
    assert_eq!(ctx.fixtures.get_usage_count(user.id, "general").await.unwrap(), 1);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_charge_balance_once_allowance_is_used(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("payg@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);
    ctx.fixtures
        .set_free_operations(user.id, 500, Utc::now() + Duration::days(10))
        .await
        .unwrap();
    ctx.fixtures.set_balance(user.id, Decimal::new(1, 0)).await.unwrap();

    let response = ctx
        .client
        .post_with_auth("/api/operations/process", &json!({ "operationType": "ocr" }), &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("operation")["usedFreeOperation"], false);
    assert_eq!(decimal(&response.field("operation")["cost"]), Decimal::new(5, 3));
    assert_eq!(
        decimal(&response.field("account")["currentBalance"]),
        Decimal::new(995, 3)
    );

    assert_eq!(
        ctx.fixtures.get_balance(user.id).await.unwrap(),
        Decimal::new(995, 3)
    );
    assert_eq!(ctx.fixtures.count_transactions(user.id).await.unwrap(), 1);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_require_payment_when_balance_is_insufficient(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("broke@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);
    ctx.fixtures
        .set_free_operations(user.id, 500, Utc::now() + Duration::days(10))
        .await
        .unwrap();
    ctx.fixtures.set_balance(user.id, Decimal::new(4, 3)).await.unwrap();

    let check = ctx
        .client
        .post_with_auth("/api/operations/check", &json!({ "operationType": "split" }), &token)
        .await
        .unwrap();

    check.assert_status(StatusCode::OK);
    assert_eq!(check.field("canPerform"), false);
    assert!(check.field("error").as_str().unwrap().contains("Insufficient balance"));

    let response = ctx
        .client
        .post_with_auth("/api/operations/process", &json!({ "operationType": "split" }), &token)
        .await
        .unwrap();

    response
        .assert_status(StatusCode::PAYMENT_REQUIRED)
        .assert_error_message("Insufficient balance");

    assert_eq!(
        ctx.fixtures.get_balance(user.id).await.unwrap(),
        Decimal::new(4, 3)
    );
    assert_eq!(ctx.fixtures.get_usage_count(user.id, "split").await.unwrap(), 0);
    assert_eq!(ctx.fixtures.count_transactions(user.id).await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reset_allowance_lazily_when_reset_date_passed(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("lapsed@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);
    ctx.fixtures
        .set_free_operations(user.id, 500, Utc::now() - Duration::days(1))
        .await
        .unwrap();

    let check = ctx
        .client
        .post_with_auth("/api/operations/check", &json!({}), &token)
        .await
        .unwrap();
    assert_eq!(check.field("freeOperationsRemaining"), 500);
    // Reading does not persist the reset
    assert_eq!(ctx.fixtures.get_free_operations_used(user.id).await.unwrap(), 500);

    let response = ctx
        .client
        .post_with_auth("/api/operations/process", &json!({}), &token)
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("operation")["usedFreeOperation"], true);
    assert_eq!(ctx.fixtures.get_free_operations_used(user.id).await.unwrap(), 1);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_reject_malformed_operation_names(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("names@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);

    let response = ctx
        .client
        .post_with_auth(
            "/api/operations/process",
            &json!({ "operationType": "DROP TABLE users;" }),
            &token,
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Invalid operation type");
    assert_eq!(ctx.fixtures.get_free_operations_used(user.id).await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_never_overspend_under_concurrent_charges(ctx: &TestContext) {
    let user = ctx.fixtures.create_user("race@example.com").await.unwrap();
    let token = generate_test_jwt(&user.id, &ctx.config.jwt_secret);
    ctx.fixtures
        .set_free_operations(user.id, 500, Utc::now() + Duration::days(10))
        .await
        .unwrap();
    // Enough for exactly three paid operations
    ctx.fixtures.set_balance(user.id, Decimal::new(15, 3)).await.unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let client = ctx.client.clone();
            let token = token.clone();
            tokio::spawn(async move {
                client
                    .post_with_auth("/api/operations/process", &json!({}), &token)
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        if response.status == StatusCode::OK {
            succeeded += 1;
        } else {
            response.assert_status(StatusCode::PAYMENT_REQUIRED);
        }
    }

    assert_eq!(succeeded, 3);
    assert_eq!(ctx.fixtures.get_balance(user.id).await.unwrap(), Decimal::ZERO);
}
