use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::entities::TransactionType;

/// Default capacity of the in-process event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("event channel is full")]
    ChannelFull,
    #[error("event channel is closed")]
    ChannelClosed,
}

/// Publishes domain events to the background processor
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with the receiving end of a bounded channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Enqueues an event without waiting for channel capacity.
    pub fn send(&self, event: Event) -> Result<(), EventError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EventError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => EventError::ChannelClosed,
        })
    }

    /// Sends an event after a committed write; failures are logged and dropped.
    pub fn publish(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event) {
            warn!(event = name, error = %e, "Failed to publish event");
        }
    }
}

/// Events emitted after a write has committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CategoryCreated(i32),
    CategoryUpdated(i32),
    CategoryDeleted(i32),
    ProductCreated(i32),
    ProductUpdated(i32),
    ProductDeleted(i32),
    StockMoved {
        product_id: i32,
        transaction_id: i32,
        kind: TransactionType,
        quantity: i32,
        new_quantity: i32,
        user_id: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::CategoryCreated(_) => "category_created",
            Event::CategoryUpdated(_) => "category_updated",
            Event::CategoryDeleted(_) => "category_deleted",
            Event::ProductCreated(_) => "product_created",
            Event::ProductUpdated(_) => "product_updated",
            Event::ProductDeleted(_) => "product_deleted",
            Event::StockMoved {
                kind: TransactionType::In,
                ..
            } => "stock_in",
            Event::StockMoved {
                kind: TransactionType::Out,
                ..
            } => "stock_out",
        }
    }
}

/// Drains the event channel until every sender is dropped
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockMoved {
                product_id,
                transaction_id,
                kind,
                quantity,
                new_quantity,
                user_id,
                ..
            } => {
                info!(
                    event = event.name(),
                    product_id,
                    transaction_id,
                    kind = kind.as_str(),
                    quantity,
                    new_quantity,
                    user_id = %user_id,
                    "Stock moved"
                );
            }
            other => {
                info!(event = other.name(), payload = ?other, "Domain event");
            }
        }
    }

    info!("Event processing loop stopped");
}
