mod common;

use axum::http::Method;
use chrono::{TimeZone, Utc};
use inventory_api::entities::TransactionType;
use serde_json::{json, Value};

use common::{response_json, TestApp};

fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .expect("array body")
        .iter()
        .map(|row| row["id"].as_i64().expect("transaction id"))
        .collect()
}

#[tokio::test]
async fn date_range_is_inclusive_and_newest_first() {
    let app = TestApp::new().await;
    let category_id = app.seed_category("Hardware").await;
    let product_id = app.seed_product(category_id, "Screw", 100).await;

    let day1 = app
        .insert_transaction_at(
            product_id,
            TransactionType::In,
            1,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        )
        .await;
    let day3 = app
        .insert_transaction_at(
            product_id,
            TransactionType::Out,
            3,
            Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap(),
        )
        .await;
    let day5 = app
        .insert_transaction_at(
            product_id,
            TransactionType::In,
            5,
            Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap(),
        )
        .await;

    let response = app
        .request_authenticated(
            Method::GET,
            "/api/v1/transactions/date-range?startDate=2024-01-02&endDate=2024-01-05",
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(ids(&body), vec![i64::from(day5.id), i64::from(day3.id)]);
    assert_eq!(body[0]["type"], "In");
    assert_eq!(body[1]["type"], "Out");

    // Timestamps are inclusive at both ends
    let response = app
        .request_authenticated(
            Method::GET,
            "/api/v1/transactions/date-range?startDate=2024-01-01T09:00:00Z&endDate=2024-01-03T09:00:00Z",
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(ids(&body), vec![i64::from(day3.id), i64::from(day1.id)]);

    let response = app
        .request_authenticated(
            Method::GET,
            "/api/v1/transactions/date-range?startDate=2024-02-01&endDate=2024-02-28",
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await, json!([]));
}

#[tokio::test]
async fn date_range_rejects_bad_parameters() {
    let app = TestApp::new().await;

    for query in [
        "startDate=2024-01-05&endDate=2024-01-01",
        "startDate=yesterday&endDate=2024-01-01",
        "startDate=2024-01-01",
        "",
    ] {
        let response = app
            .request_authenticated(
                Method::GET,
                &format!("/api/v1/transactions/date-range?{}", query),
                None,
            )
            .await;
        assert_eq!(response.status(), 400, "query '{}'", query);
    }
}

#[tokio::test]
async fn ledger_lists_and_lookups() {
    let app = TestApp::new().await;
    let category_id = app.seed_category("Hardware").await;
    let nails = app.seed_product(category_id, "Nails", 50).await;
    let tacks = app.seed_product(category_id, "Tacks", 50).await;

    let older = app
        .insert_transaction_at(
            nails,
            TransactionType::In,
            10,
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        )
        .await;
    let newer = app
        .insert_transaction_at(
            tacks,
            TransactionType::Out,
            4,
            Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap(),
        )
        .await;

    let all = response_json(
        app.request_authenticated(Method::GET, "/api/v1/transactions", None)
            .await,
    )
    .await;
    assert_eq!(ids(&all), vec![i64::from(newer.id), i64::from(older.id)]);

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/transactions/{}", older.id),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let one = response_json(response).await;
    assert_eq!(one["productId"], nails);
    assert_eq!(one["type"], "In");
    assert_eq!(one["quantity"], 10);
    assert_eq!(one["product"]["name"], "Nails");
    assert_eq!(one["transactionDate"], "2024-03-01T08:00:00Z");

    let for_tacks = response_json(
        app.request_authenticated(
            Method::GET,
            &format!("/api/v1/transactions/product/{}", tacks),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(ids(&for_tacks), vec![i64::from(newer.id)]);

    // Unknown products simply have no history
    let response = app
        .request_authenticated(Method::GET, "/api/v1/transactions/product/9999", None)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await, json!([]));

    let response = app
        .request_authenticated(Method::GET, "/api/v1/transactions/9999", None)
        .await;
    assert_eq!(response.status(), 404);
}
