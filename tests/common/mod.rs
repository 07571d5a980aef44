#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, Utc};
use inventory_api::{
    auth::Claims,
    config::AppConfig,
    db::{self, DbConfig},
    entities::{transaction, TransactionType},
    events::{self, EventSender},
    AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const TEST_USER: &str = "alice";

/// Helper harness for spinning up an application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Application with bearer authentication enforced.
    pub async fn new() -> Self {
        Self::build(true).await
    }

    /// Application with authentication disabled; stock moves are recorded as `System`.
    pub async fn without_auth() -> Self {
        Self::build(false).await
    }

    async fn build(auth_enabled: bool) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "development".to_string(),
        );
        cfg.auth_enabled = auth_enabled;

        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = EventSender::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg.clone(), Arc::new(event_sender));
        let router = inventory_api::app(state.clone());

        Self {
            router,
            state,
            token: mint_token(&cfg, TEST_USER, 3600),
            _event_task: event_task,
        }
    }

    /// Bearer token for the default test user.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Creates a category and returns its id.
    pub async fn seed_category(&self, name: &str) -> i64 {
        let response = self
            .request_authenticated(
                Method::POST,
                "/api/v1/categories",
                Some(json!({ "name": name, "description": format!("{} tools", name) })),
            )
            .await;
        assert_eq!(response.status(), 201, "seed category {}", name);
        response_json(response).await["id"]
            .as_i64()
            .expect("category id")
    }

    /// Creates a product in `category_id` and returns its id.
    pub async fn seed_product(&self, category_id: i64, name: &str, quantity: i32) -> i64 {
        let response = self
            .request_authenticated(
                Method::POST,
                "/api/v1/products",
                Some(json!({
                    "name": name,
                    "description": format!("{} for testing", name),
                    "price": 12.5,
                    "quantity": quantity,
                    "categoryId": category_id,
                })),
            )
            .await;
        assert_eq!(response.status(), 201, "seed product {}", name);
        response_json(response).await["id"]
            .as_i64()
            .expect("product id")
    }

    /// Inserts a ledger row with a fixed date, bypassing the stock endpoints.
    pub async fn insert_transaction_at(
        &self,
        product_id: i64,
        kind: TransactionType,
        quantity: i32,
        at: DateTime<Utc>,
    ) -> transaction::Model {
        transaction::ActiveModel {
            product_id: Set(product_id as i32),
            r#type: Set(kind),
            quantity: Set(quantity),
            transaction_date: Set(at),
            notes: Set(Some(kind.default_note().to_string())),
            user_id: Set(TEST_USER.to_string()),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("insert dated transaction")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Signs an HS256 token the app accepts; a negative `ttl_secs` yields an expired token.
pub fn mint_token(cfg: &AppConfig, name: &str, ttl_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: format!("{}-id", name),
        name: Some(name.to_string()),
        jti: Some(uuid::Uuid::new_v4().to_string()),
        iat: now,
        exp: now + ttl_secs,
        iss: cfg.auth_issuer.clone(),
        aud: cfg.auth_audience.clone(),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )
    .expect("encode access token")
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
