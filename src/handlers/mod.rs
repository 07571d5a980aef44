pub mod categories;
pub mod common;
pub mod products;
pub mod transactions;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{CategoryService, ProductService, TransactionService};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

pub use categories::categories_routes;
pub use products::products_routes;
pub use transactions::transactions_routes;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub transactions: Arc<TransactionService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            categories: Arc::new(CategoryService::new(db_pool.clone(), event_sender.clone())),
            products: Arc::new(ProductService::new(db_pool.clone(), event_sender)),
            transactions: Arc::new(TransactionService::new(db_pool)),
        }
    }
}
