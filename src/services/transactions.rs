use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Select};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entities::{
        product::{self, Entity as Product},
        transaction::{self, Column as TransactionColumn, Entity as Transaction},
        TransactionType,
    },
    errors::ServiceError,
};

/// Product fields inlined into ledger responses
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: i32,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    pub quantity: i32,
    pub category_id: i32,
}

impl From<product::Model> for ProductSummary {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            quantity: model.quantity,
            category_id: model.category_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: i32,
    pub product_id: i32,
    pub product: Option<ProductSummary>,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub transaction_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub user_id: String,
}

impl From<(transaction::Model, Option<product::Model>)> for TransactionResponse {
    fn from((entry, product): (transaction::Model, Option<product::Model>)) -> Self {
        Self {
            id: entry.id,
            product_id: entry.product_id,
            product: product.map(ProductSummary::from),
            transaction_type: entry.r#type,
            quantity: entry.quantity,
            transaction_date: entry.transaction_date,
            notes: entry.notes,
            user_id: entry.user_id,
        }
    }
}

/// Read-only access to the stock-movement ledger. Rows are only ever
/// written by `ProductService::stock_in` / `stock_out`.
#[derive(Clone)]
pub struct TransactionService {
    db_pool: Arc<DbPool>,
}

impl TransactionService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// All ledger rows, newest first
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<TransactionResponse>, ServiceError> {
        self.fetch(Transaction::find()).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<TransactionResponse, ServiceError> {
        Transaction::find_by_id(id)
            .find_also_related(Product)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(transaction_id = id, error = %e, "Database error when fetching transaction");
                ServiceError::DatabaseError(e)
            })?
            .map(TransactionResponse::from)
            .ok_or_else(|| ServiceError::not_found("Transaction", id))
    }

    /// Ledger rows for one product, newest first. Unknown products yield an empty list.
    #[instrument(skip(self))]
    pub async fn list_by_product(
        &self,
        product_id: i32,
    ) -> Result<Vec<TransactionResponse>, ServiceError> {
        self.fetch(Transaction::find().filter(TransactionColumn::ProductId.eq(product_id)))
            .await
    }

    /// Ledger rows with `start <= transaction_date <= end`, newest first.
    #[instrument(skip(self))]
    pub async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionResponse>, ServiceError> {
        if start > end {
            return Err(ServiceError::ValidationError(
                "startDate must not be after endDate".to_string(),
            ));
        }

        self.fetch(
            Transaction::find()
                .filter(TransactionColumn::TransactionDate.gte(start))
                .filter(TransactionColumn::TransactionDate.lte(end)),
        )
        .await
    }

    async fn fetch(
        &self,
        query: Select<Transaction>,
    ) -> Result<Vec<TransactionResponse>, ServiceError> {
        let rows = query
            .find_also_related(Product)
            .order_by_desc(TransactionColumn::TransactionDate)
            .order_by_desc(TransactionColumn::Id)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list transactions");
                ServiceError::DatabaseError(e)
            })?;

        Ok(rows.into_iter().map(TransactionResponse::from).collect())
    }
}
