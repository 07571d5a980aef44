use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory API",
        version = "1.0.0",
        description = r#"
# Inventory API

Manage product categories, products and the stock-movement ledger.

## Authentication

Every `/api/v1` endpoint except `/api/v1/status` expects an HS256 JWT:

```
Authorization: Bearer <your-jwt-token>
```

Stock movements are attributed to the token's `name` claim.

## Error Handling

Failures share one body shape:

```json
{
  "error": "Bad Request",
  "message": "Insufficient stock",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Categories", description = "Product category endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Stock", description = "Stock movement endpoints"),
        (name = "Transactions", description = "Read-only stock ledger endpoints")
    ),
    paths(
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::stock_in,
        crate::handlers::products::stock_out,

        crate::handlers::transactions::list_transactions,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::list_product_transactions,
        crate::handlers::transactions::list_transactions_by_date_range,
    ),
    components(
        schemas(
            crate::services::CategoryInput,
            crate::services::CategoryResponse,
            crate::services::ProductInput,
            crate::services::ProductResponse,
            crate::services::TransactionResponse,
            crate::services::transactions::ProductSummary,
            crate::entities::TransactionType,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_and_bearer_scheme() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Inventory API"));
        assert!(json.contains("/api/v1/categories/{id}"));
        assert!(json.contains("/api/v1/products/{id}/stock-out"));
        assert!(json.contains("/api/v1/transactions/date-range"));
        assert!(json.contains("\"Bearer\""));
    }
}
