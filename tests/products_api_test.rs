mod common;

use axum::http::{header, Method};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::str::FromStr;

use common::{response_json, TestApp};

fn price_of(product: &Value) -> Decimal {
    match &product["price"] {
        Value::String(raw) => Decimal::from_str(raw).expect("decimal price"),
        other => Decimal::from_str(&other.to_string()).expect("numeric price"),
    }
}

#[tokio::test]
async fn product_lifecycle_inlines_category() {
    let app = TestApp::new().await;
    let category_id = app.seed_category("Garden").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Rake",
                "description": "Leaf rake",
                "price": "4.25",
                "quantity": 7,
                "categoryId": category_id,
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let location = response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .unwrap()
        .to_string();
    let created = response_json(response).await;
    let id = created["id"].as_i64().expect("product id");
    assert_eq!(location, format!("/api/v1/products/{}", id));
    assert_eq!(created["quantity"], 7);
    assert_eq!(price_of(&created), dec!(4.25));
    assert!(created["createdAt"].is_string());

    let response = app.request_authenticated(Method::GET, &location, None).await;
    assert_eq!(response.status(), 200);
    let fetched = response_json(response).await;
    assert_eq!(fetched["name"], "Rake");
    assert_eq!(fetched["description"], "Leaf rake");
    assert_eq!(fetched["categoryId"], category_id);
    assert_eq!(fetched["category"]["name"], "Garden");
    assert_eq!(price_of(&fetched), dec!(4.25));

    let response = app
        .request_authenticated(
            Method::PUT,
            &location,
            Some(json!({
                "name": "Rake XL",
                "description": "Wide leaf rake",
                "price": 12.5,
                "quantity": 2,
                "categoryId": category_id,
            })),
        )
        .await;
    assert_eq!(response.status(), 204);

    let fetched = response_json(app.request_authenticated(Method::GET, &location, None).await).await;
    assert_eq!(fetched["name"], "Rake XL");
    assert_eq!(fetched["quantity"], 2);
    assert_eq!(price_of(&fetched), dec!(12.5));
    assert!(fetched["updatedAt"].is_string());

    let listed = response_json(
        app.request_authenticated(Method::GET, "/api/v1/products", None)
            .await,
    )
    .await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["category"]["id"], category_id);

    let response = app.request_authenticated(Method::DELETE, &location, None).await;
    assert_eq!(response.status(), 204);
    let response = app.request_authenticated(Method::GET, &location, None).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn unknown_category_is_rejected_without_creating_a_product() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Orphan",
                "description": "No category",
                "price": 1,
                "quantity": 1,
                "categoryId": 4242,
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Validation error: Invalid category id");

    let listed = response_json(
        app.request_authenticated(Method::GET, "/api/v1/products", None)
            .await,
    )
    .await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn update_to_unknown_category_is_rejected() {
    let app = TestApp::new().await;
    let category_id = app.seed_category("Paint").await;
    let product_id = app.seed_product(category_id, "Roller", 4).await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/products/{}", product_id),
            Some(json!({
                "name": "Roller",
                "description": "Paint roller",
                "price": 3,
                "quantity": 4,
                "categoryId": category_id + 100,
            })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let fetched = response_json(
        app.request_authenticated(
            Method::GET,
            &format!("/api/v1/products/{}", product_id),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(fetched["categoryId"], category_id);
}

#[tokio::test]
async fn invalid_product_fields_are_rejected() {
    let app = TestApp::new().await;
    let category_id = app.seed_category("Electrical").await;

    let valid = json!({
        "name": "Cable",
        "description": "Copper cable",
        "price": 2,
        "quantity": 10,
        "categoryId": category_id,
    });

    let mut cases = Vec::new();
    for (field, value) in [
        ("name", json!("")),
        ("name", json!("n".repeat(101))),
        ("description", json!("")),
        ("description", json!("d".repeat(501))),
        ("price", json!(-1)),
        ("quantity", json!(-5)),
        ("quantity", json!("lots")),
    ] {
        let mut payload = valid.clone();
        payload[field] = value;
        cases.push(payload);
    }

    for payload in cases {
        let response = app
            .request_authenticated(Method::POST, "/api/v1/products", Some(payload.clone()))
            .await;
        assert_eq!(response.status(), 400, "payload {} should be rejected", payload);
    }
}

#[tokio::test]
async fn missing_product_reports_not_found() {
    let app = TestApp::new().await;
    let category_id = app.seed_category("Lumber").await;

    let response = app
        .request_authenticated(
            Method::PUT,
            "/api/v1/products/77",
            Some(json!({
                "name": "Plank",
                "description": "Pine plank",
                "price": 5,
                "quantity": 1,
                "categoryId": category_id,
            })),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request_authenticated(Method::DELETE, "/api/v1/products/77", None)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn product_with_transactions_cannot_be_deleted() {
    let app = TestApp::new().await;
    let category_id = app.seed_category("Hardware").await;
    let product_id = app.seed_product(category_id, "Hinge", 10).await;
    let product_uri = format!("/api/v1/products/{}", product_id);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("{}/stock-out", product_uri),
            Some(json!(1)),
        )
        .await;
    assert_eq!(response.status(), 204);

    let response = app.request_authenticated(Method::DELETE, &product_uri, None).await;
    assert_eq!(response.status(), 409);

    let response = app.request_authenticated(Method::GET, &product_uri, None).await;
    assert_eq!(response.status(), 200);
}
