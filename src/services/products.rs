use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::{validate_not_blank, Actor, CategoryResponse, WriteOutcome};
use crate::{
    db::DbPool,
    entities::{
        category::{self, Entity as Category},
        product::{self, Column as ProductColumn, Entity as Product},
        transaction, TransactionType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Body of `POST /products` and `PUT /products/{id}`
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    #[schema(example = "Claw hammer", max_length = 100)]
    pub name: String,
    #[validate(length(min = 1, max = 500), custom = "validate_not_blank")]
    #[schema(example = "16oz steel claw hammer", max_length = 500)]
    pub description: String,
    #[validate(custom = "validate_non_negative_price")]
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    #[schema(example = 10, minimum = 0)]
    pub quantity: i32,
    #[schema(example = 1)]
    pub category_id: i32,
}

/// Product with its category inlined
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    pub quantity: i32,
    pub category_id: i32,
    pub category: Option<CategoryResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<(product::Model, Option<category::Model>)> for ProductResponse {
    fn from((product, category): (product::Model, Option<category::Model>)) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            quantity: product.quantity,
            category_id: product.category_id,
            category: category.map(CategoryResponse::from),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

fn validate_non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        let mut err = ValidationError::new("price_negative");
        err.message = Some("price must be greater than or equal to 0".into());
        return Err(err);
    }
    Ok(())
}

fn invalid_category() -> ServiceError {
    ServiceError::ValidationError("Invalid category id".to_string())
}

/// Service for managing products and their stock level
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ProductResponse>, ServiceError> {
        let rows = Product::find()
            .find_also_related(Category)
            .order_by_asc(ProductColumn::Id)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list products");
                ServiceError::DatabaseError(e)
            })?;

        Ok(rows.into_iter().map(ProductResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<ProductResponse, ServiceError> {
        Product::find_by_id(id)
            .find_also_related(Category)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(product_id = id, error = %e, "Database error when fetching product");
                ServiceError::DatabaseError(e)
            })?
            .map(ProductResponse::from)
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    #[instrument(skip(self, input), fields(name = %input.name, category_id = input.category_id))]
    pub async fn create(&self, input: ProductInput) -> Result<ProductResponse, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;

        let category = Category::find_by_id(input.category_id)
            .one(db)
            .await?
            .ok_or_else(invalid_category)?;

        let model = product::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            quantity: Set(input.quantity),
            category_id: Set(input.category_id),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            version: Set(1),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create product");
            ServiceError::from_fk_violation(e, invalid_category)
        })?;

        self.event_sender.publish(Event::ProductCreated(model.id));
        info!(product_id = model.id, "Product created");

        Ok((model, Some(category)).into())
    }

    /// Overwrites every editable field and stamps `updated_at`.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: ProductInput) -> Result<(), ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;

        let current = self
            .find_model(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))?;

        if Category::find_by_id(input.category_id).one(db).await?.is_none() {
            return Err(invalid_category());
        }

        self.apply_update(id, current.version, input).await
    }

    /// Writes `input` if the row is still at `expected_version`; otherwise
    /// rechecks whether the product still exists.
    async fn apply_update(
        &self,
        id: i32,
        expected_version: i32,
        input: ProductInput,
    ) -> Result<(), ServiceError> {
        match self.write_versioned(id, expected_version, input).await? {
            WriteOutcome::Written => {
                self.event_sender.publish(Event::ProductUpdated(id));
                info!(product_id = id, "Product updated");
                Ok(())
            }
            WriteOutcome::Conflict => {
                counter!("inventory.write_conflicts", 1, "entity" => "product");
                if self.find_model(id).await?.is_some() {
                    warn!(product_id = id, "Concurrent modification of product");
                    Err(ServiceError::Conflict(format!(
                        "Product {} was modified concurrently",
                        id
                    )))
                } else {
                    Err(ServiceError::not_found("Product", id))
                }
            }
        }
    }

    /// Removes a product; rejected while ledger rows reference it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        if self.find_model(id).await?.is_none() {
            return Err(ServiceError::not_found("Product", id));
        }

        let referencing = transaction::Entity::find()
            .filter(transaction::Column::ProductId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if referencing > 0 {
            return Err(ServiceError::Conflict(format!(
                "product is referenced by {} existing transactions",
                referencing
            )));
        }

        let result = Product::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                ServiceError::from_fk_violation(e, || {
                    ServiceError::Conflict("product is referenced by existing transactions".into())
                })
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Product", id));
        }

        self.event_sender.publish(Event::ProductDeleted(id));
        info!(product_id = id, "Product deleted");
        Ok(())
    }

    /// Adds `quantity` units and records an `In` ledger row in the same
    /// database transaction.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn stock_in(
        &self,
        id: i32,
        quantity: i32,
        actor: &Actor,
    ) -> Result<transaction::Model, ServiceError> {
        self.move_stock(id, TransactionType::In, quantity, actor).await
    }

    /// Removes `quantity` units and records an `Out` ledger row in the same
    /// database transaction. The quantity never drops below zero.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn stock_out(
        &self,
        id: i32,
        quantity: i32,
        actor: &Actor,
    ) -> Result<transaction::Model, ServiceError> {
        self.move_stock(id, TransactionType::Out, quantity, actor).await
    }

    async fn move_stock(
        &self,
        id: i32,
        kind: TransactionType,
        quantity: i32,
        actor: &Actor,
    ) -> Result<transaction::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be greater than zero".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let user_id = actor.as_str().to_string();
        let now = Utc::now();

        let recorded = db
            .transaction::<_, Option<(transaction::Model, i32)>, ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut update = Product::update_many()
                        .col_expr(ProductColumn::UpdatedAt, Expr::value(Some(now)))
                        .col_expr(ProductColumn::Version, Expr::col(ProductColumn::Version).add(1))
                        .filter(ProductColumn::Id.eq(id));

                    update = match kind {
                        TransactionType::In => update
                            .col_expr(
                                ProductColumn::Quantity,
                                Expr::col(ProductColumn::Quantity).add(quantity),
                            )
                            .filter(ProductColumn::Quantity.lte(i32::MAX - quantity)),
                        TransactionType::Out => update
                            .col_expr(
                                ProductColumn::Quantity,
                                Expr::col(ProductColumn::Quantity).sub(quantity),
                            )
                            .filter(ProductColumn::Quantity.gte(quantity)),
                    };

                    if update.exec(txn).await?.rows_affected == 0 {
                        return Ok(None);
                    }

                    let entry = transaction::ActiveModel {
                        product_id: Set(id),
                        r#type: Set(kind),
                        quantity: Set(quantity),
                        transaction_date: Set(now),
                        notes: Set(Some(kind.default_note().to_string())),
                        user_id: Set(user_id),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    let new_quantity = Product::find_by_id(id)
                        .one(txn)
                        .await?
                        .map(|p| p.quantity)
                        .ok_or_else(|| DbErr::RecordNotFound(format!("product {}", id)))?;

                    Ok(Some((entry, new_quantity)))
                })
            })
            .await?;

        let Some((entry, new_quantity)) = recorded else {
            return Err(self.explain_rejected_move(id, kind, quantity).await?);
        };

        counter!("inventory.stock_movements", 1, "kind" => kind.as_str());
        self.event_sender.publish(Event::StockMoved {
            product_id: id,
            transaction_id: entry.id,
            kind,
            quantity,
            new_quantity,
            user_id: entry.user_id.clone(),
            at: entry.transaction_date,
        });
        info!(
            product_id = id,
            transaction_id = entry.id,
            kind = kind.as_str(),
            quantity,
            new_quantity,
            "Stock movement recorded"
        );

        Ok(entry)
    }

    /// Works out why the guarded quantity update matched no row.
    async fn explain_rejected_move(
        &self,
        id: i32,
        kind: TransactionType,
        quantity: i32,
    ) -> Result<ServiceError, ServiceError> {
        let Some(current) = self.find_model(id).await? else {
            return Ok(ServiceError::not_found("Product", id));
        };

        Ok(match kind {
            TransactionType::Out => {
                counter!("inventory.stock_out_rejected", 1);
                warn!(
                    product_id = id,
                    requested = quantity,
                    available = current.quantity,
                    "Insufficient stock"
                );
                ServiceError::InsufficientStock(format!(
                    "requested {} but only {} available for product {}",
                    quantity, current.quantity, id
                ))
            }
            TransactionType::In => ServiceError::ValidationError(format!(
                "stock-in of {} would overflow the quantity of product {}",
                quantity, id
            )),
        })
    }

    /// `UPDATE products ... WHERE id = ? AND version = ?`
    async fn write_versioned(
        &self,
        id: i32,
        expected_version: i32,
        input: ProductInput,
    ) -> Result<WriteOutcome, ServiceError> {
        let result = Product::update_many()
            .col_expr(ProductColumn::Name, Expr::value(input.name))
            .col_expr(ProductColumn::Description, Expr::value(input.description))
            .col_expr(ProductColumn::Price, Expr::value(input.price))
            .col_expr(ProductColumn::Quantity, Expr::value(input.quantity))
            .col_expr(ProductColumn::CategoryId, Expr::value(input.category_id))
            .col_expr(ProductColumn::UpdatedAt, Expr::value(Some(Utc::now())))
            .col_expr(ProductColumn::Version, Expr::col(ProductColumn::Version).add(1))
            .filter(ProductColumn::Id.eq(id))
            .filter(ProductColumn::Version.eq(expected_version))
            .exec(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_fk_violation(e, invalid_category))?;

        Ok(WriteOutcome::from_rows_affected(result.rows_affected))
    }

    async fn find_model(&self, id: i32) -> Result<Option<product::Model>, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(product_id = id, error = %e, "Database error when fetching product");
                ServiceError::DatabaseError(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{test_support::migrated_pool, CategoryInput, CategoryService};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    async fn service_with_category() -> (ProductService, i32, tokio::sync::mpsc::Receiver<Event>) {
        let (db, events, rx) = migrated_pool().await;
        let category = CategoryService::new(db.clone(), events.clone())
            .create(CategoryInput {
                name: "Hardware".into(),
                description: None,
            })
            .await
            .unwrap();
        (ProductService::new(db, events), category.id, rx)
    }

    fn input() -> ProductInput {
        ProductInput {
            name: "Claw hammer".into(),
            description: "16oz steel".into(),
            price: dec!(19.99),
            quantity: 5,
            category_id: 1,
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut bad = input();
        bad.price = dec!(-0.01);
        assert!(bad.validate().is_err());

        let mut free = input();
        free.price = Decimal::ZERO;
        assert!(free.validate().is_ok());
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let mut bad = input();
        bad.quantity = -1;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn description_is_required_and_bounded() {
        let mut empty = input();
        empty.description = String::new();
        assert!(empty.validate().is_err());

        let mut long = input();
        long.description = "d".repeat(501);
        assert!(long.validate().is_err());
    }

    #[test]
    fn input_reads_camel_case_category_id() {
        let parsed: ProductInput = serde_json::from_str(
            r#"{"name":"Saw","description":"Hand saw","price":"12.50","quantity":3,"categoryId":7}"#,
        )
        .unwrap();
        assert_eq!(parsed.category_id, 7);
        assert_eq!(parsed.price, dec!(12.50));
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict_when_the_product_still_exists() {
        let (service, category_id, _rx) = service_with_category().await;
        let mut payload = input();
        payload.category_id = category_id;
        let created = service.create(payload.clone()).await.unwrap();

        payload.quantity = 9;
        service.update(created.id, payload.clone()).await.unwrap();

        payload.quantity = 1;
        let err = service
            .apply_update(created.id, 1, payload)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));
        assert_eq!(service.get(created.id).await.unwrap().quantity, 9);
    }

    #[tokio::test]
    async fn stale_write_to_a_deleted_product_is_not_found() {
        let (service, category_id, _rx) = service_with_category().await;
        let mut payload = input();
        payload.category_id = category_id;
        let created = service.create(payload.clone()).await.unwrap();
        service.delete(created.id).await.unwrap();

        let err = service
            .apply_update(created.id, 1, payload)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_));
    }

    #[tokio::test]
    async fn product_with_ledger_rows_cannot_be_deleted() {
        let (service, category_id, _rx) = service_with_category().await;
        let mut payload = input();
        payload.category_id = category_id;
        let created = service.create(payload).await.unwrap();
        service
            .stock_out(created.id, 2, &Actor::system())
            .await
            .unwrap();

        assert_matches!(
            service.delete(created.id).await,
            Err(ServiceError::Conflict(_))
        );
        assert_eq!(service.get(created.id).await.unwrap().quantity, 3);
    }
}
