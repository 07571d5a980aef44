pub mod categories;
pub mod products;
pub mod transactions;

use std::fmt;
use validator::ValidationError;

pub use categories::{CategoryInput, CategoryResponse, CategoryService};
pub use products::{ProductInput, ProductResponse, ProductService};
pub use transactions::{TransactionResponse, TransactionService};

/// Identity recorded on ledger rows written by stock operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(String);

impl Actor {
    pub const SYSTEM: &'static str = "System";

    pub fn new(name: impl Into<String>) -> Self {
        Actor(name.into())
    }

    /// Actor used when no authenticated user is attached to the request
    pub fn system() -> Self {
        Actor(Self::SYSTEM.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a version-guarded write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// No row matched the expected version: the record changed or disappeared
    Conflict,
}

impl WriteOutcome {
    pub(crate) fn from_rows_affected(rows: u64) -> Self {
        if rows == 0 {
            WriteOutcome::Conflict
        } else {
            WriteOutcome::Written
        }
    }
}

/// Rejects empty or whitespace-only strings
pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use crate::db::{establish_connection_with_config, run_migrations, DbConfig, DbPool};
    use crate::events::{Event, EventSender};

    /// Migrated in-memory database plus an event channel whose receiver the
    /// caller keeps alive.
    pub(crate) async fn migrated_pool() -> (Arc<DbPool>, Arc<EventSender>, mpsc::Receiver<Event>) {
        let pool = establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        let (sender, rx) = EventSender::channel(64);
        (Arc::new(pool), Arc::new(sender), rx)
    }
}
