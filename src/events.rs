use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::order::OrderStatus;

/// Domain events emitted by services after a successful write. Event
/// delivery is best-effort and never fails the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    UserRegistered(Uuid),
    UserUpdated(Uuid),

    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    CategoryDeleted(Uuid),

    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeactivated(Uuid),

    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCancelled(Uuid),

    CartItemAdded {
        user_id: Uuid,
        product_id: Uuid,
    },
    CartCleared(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {e}"))
    }

    /// Sends and logs on failure instead of propagating; used on paths
    /// where the write already committed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!(error = %e, ?event, "event delivery failed");
        }
    }
}

/// Consumer task for the event channel. Spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "event processed");
    }
    info!("event channel closed, processor exiting");
}
