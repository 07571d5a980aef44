use crate::handlers::common::{success_response, DateRangeParams};
use crate::{errors::ServiceError, services::TransactionResponse, AppState};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Response,
    routing::get,
    Router,
};

/// Creates the router for the read-only ledger endpoints
pub fn transactions_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions))
        .route("/date-range", get(list_transactions_by_date_range))
        .route("/product/:product_id", get(list_product_transactions))
        .route("/:id", get(get_transaction))
}

/// List every transaction, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "All transactions, newest first", body = [TransactionResponse])
    ),
    security(("Bearer" = [])),
    tag = "Transactions"
)]
pub async fn list_transactions(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let transactions = state.services.transactions.list().await?;
    Ok(success_response(transactions))
}

/// Get a transaction by id
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    params(("id" = i32, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction found", body = TransactionResponse),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let transaction = state.services.transactions.get(id).await?;
    Ok(success_response(transaction))
}

/// List one product's transactions, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions/product/{product_id}",
    params(("product_id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Transactions for the product", body = [TransactionResponse])
    ),
    security(("Bearer" = [])),
    tag = "Transactions"
)]
pub async fn list_product_transactions(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<Response, ServiceError> {
    let transactions = state
        .services
        .transactions
        .list_by_product(product_id)
        .await?;
    Ok(success_response(transactions))
}

/// List transactions dated within an inclusive range, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions/date-range",
    params(DateRangeParams),
    responses(
        (status = 200, description = "Transactions within the range", body = [TransactionResponse]),
        (status = 400, description = "Missing or malformed dates", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Transactions"
)]
pub async fn list_transactions_by_date_range(
    State(state): State<AppState>,
    query: Result<Query<DateRangeParams>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let (start, end) = DateRangeParams::from_query(query)?.to_utc_range()?;
    let transactions = state
        .services
        .transactions
        .list_by_date_range(start, end)
        .await?;
    Ok(success_response(transactions))
}
