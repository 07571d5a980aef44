use crate::handlers::common::{created_response, json_body, no_content_response, success_response};
use crate::{
    errors::ServiceError,
    services::{Actor, ProductInput, ProductResponse},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    response::Response,
    routing::{get, post},
    Router,
};

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/stock-in", post(stock_in))
        .route("/:id/stock-out", post(stock_out))
}

/// List all products with their category
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses(
        (status = 200, description = "All products", body = [ProductResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn list_products(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let products = state.services.products.list().await?;
    Ok(success_response(products))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let product = state.services.products.get(id).await?;
    Ok(success_response(product))
}

/// Create a product in an existing category
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid payload or unknown category", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let input = json_body(payload)?;
    let product = state.services.products.create(input).await?;
    Ok(created_response(
        format!("/api/v1/products/{}", product.id),
        product,
    ))
}

/// Overwrite a product
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    request_body = ProductInput,
    responses(
        (status = 204, description = "Product updated"),
        (status = 400, description = "Invalid payload or unknown category", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let input = json_body(payload)?;
    state.services.products.update(id, input).await?;
    Ok(no_content_response())
}

/// Delete a product with no recorded transactions
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product has transactions", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.products.delete(id).await?;
    Ok(no_content_response())
}

/// Receive stock; the body is the bare quantity
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/stock-in",
    params(("id" = i32, Path, description = "Product id")),
    request_body(content = i32, description = "Units received", example = json!(5)),
    responses(
        (status = 204, description = "Stock added and transaction recorded"),
        (status = 400, description = "Quantity is not positive", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stock"
)]
pub async fn stock_in(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    payload: Result<Json<i32>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let quantity = json_body(payload)?;
    state.services.products.stock_in(id, quantity, &actor).await?;
    Ok(no_content_response())
}

/// Issue stock; the body is the bare quantity
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/stock-out",
    params(("id" = i32, Path, description = "Product id")),
    request_body(content = i32, description = "Units issued", example = json!(2)),
    responses(
        (status = 204, description = "Stock removed and transaction recorded"),
        (status = 400, description = "Quantity is not positive or exceeds stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stock"
)]
pub async fn stock_out(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    payload: Result<Json<i32>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let quantity = json_body(payload)?;
    state.services.products.stock_out(id, quantity, &actor).await?;
    Ok(no_content_response())
}
