use std::sync::Arc;

use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use super::{validate_not_blank, WriteOutcome};
use crate::{
    db::DbPool,
    entities::{
        category::{self, Column as CategoryColumn, Entity as Category},
        product::{Column as ProductColumn, Entity as Product},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Body of `POST /categories` and `PUT /categories/{id}`
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    #[schema(example = "Hardware", max_length = 50)]
    pub name: String,
    #[validate(length(max = 200))]
    #[schema(example = "Tools and fasteners", max_length = 200)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
        }
    }
}

/// Service for managing categories
#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CategoryResponse>, ServiceError> {
        let categories = Category::find()
            .order_by_asc(CategoryColumn::Id)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list categories");
                ServiceError::DatabaseError(e)
            })?;

        Ok(categories.into_iter().map(CategoryResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<CategoryResponse, ServiceError> {
        self.find_model(id)
            .await?
            .map(CategoryResponse::from)
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CategoryInput) -> Result<CategoryResponse, ServiceError> {
        input.validate()?;

        let model = category::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            version: Set(1),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create category");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender.publish(Event::CategoryCreated(model.id));
        info!(category_id = model.id, "Category created");

        Ok(model.into())
    }

    /// Overwrites name and description. A lost race against a concurrent
    /// writer is reported as `NotFound` if the category has since been
    /// deleted, `Conflict` otherwise.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: CategoryInput) -> Result<(), ServiceError> {
        input.validate()?;

        let current = self
            .find_model(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id))?;

        self.apply_update(id, current.version, input).await
    }

    /// Writes `input` if the row is still at `expected_version`; otherwise
    /// rechecks whether the category still exists.
    async fn apply_update(
        &self,
        id: i32,
        expected_version: i32,
        input: CategoryInput,
    ) -> Result<(), ServiceError> {
        match self.write_versioned(id, expected_version, input).await? {
            WriteOutcome::Written => {
                self.event_sender.publish(Event::CategoryUpdated(id));
                info!(category_id = id, "Category updated");
                Ok(())
            }
            WriteOutcome::Conflict => {
                counter!("inventory.write_conflicts", 1, "entity" => "category");
                if self.find_model(id).await?.is_some() {
                    warn!(category_id = id, "Concurrent modification of category");
                    Err(ServiceError::Conflict(format!(
                        "Category {} was modified concurrently",
                        id
                    )))
                } else {
                    Err(ServiceError::not_found("Category", id))
                }
            }
        }
    }

    /// Removes a category; rejected while products still reference it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        if self.find_model(id).await?.is_none() {
            return Err(ServiceError::not_found("Category", id));
        }

        let referencing = Product::find()
            .filter(ProductColumn::CategoryId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if referencing > 0 {
            return Err(ServiceError::Conflict(format!(
                "category is referenced by {} existing products",
                referencing
            )));
        }

        let result = Category::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                ServiceError::from_fk_violation(e, || {
                    ServiceError::Conflict("category is referenced by existing products".into())
                })
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Category", id));
        }

        self.event_sender.publish(Event::CategoryDeleted(id));
        info!(category_id = id, "Category deleted");
        Ok(())
    }

    /// `UPDATE categories ... WHERE id = ? AND version = ?`
    async fn write_versioned(
        &self,
        id: i32,
        expected_version: i32,
        input: CategoryInput,
    ) -> Result<WriteOutcome, ServiceError> {
        let result = Category::update_many()
            .col_expr(CategoryColumn::Name, Expr::value(input.name))
            .col_expr(CategoryColumn::Description, Expr::value(input.description))
            .col_expr(
                CategoryColumn::Version,
                Expr::col(CategoryColumn::Version).add(1),
            )
            .filter(CategoryColumn::Id.eq(id))
            .filter(CategoryColumn::Version.eq(expected_version))
            .exec(&*self.db_pool)
            .await?;

        Ok(WriteOutcome::from_rows_affected(result.rows_affected))
    }

    async fn find_model(&self, id: i32) -> Result<Option<category::Model>, ServiceError> {
        Category::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(category_id = id, error = %e, "Database error when fetching category");
                ServiceError::DatabaseError(e)
            })
    }
}
