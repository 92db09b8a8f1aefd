//! NotificationDispatcher - broadcast of committed order changes
//!
//! Publishing never fails from the caller's point of view: the order write
//! has already committed, a missing or slow subscriber only loses the event.

use shared::order::Order;
use shared::util::now_millis;
use shared::{NotificationKind, OrderNotification};
use tokio::sync::broadcast;

/// Broadcast capacity; a lagging router logs and skips
const NOTIFICATION_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: broadcast::Sender<OrderNotification>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderNotification> {
        self.tx.subscribe()
    }

    /// Fire and forget
    pub fn publish(&self, notification: OrderNotification) {
        if let Err(e) = self.tx.send(notification) {
            tracing::debug!(order_id = %e.0.order_id, "No notification subscribers");
        }
    }

    /// Build and publish the notification for `order`
    pub fn notify(&self, order: &Order, kind: NotificationKind, message: impl Into<String>) {
        self.publish(OrderNotification {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            owner_id: order.owner_id.clone(),
            kind,
            status: order.status,
            message: message.into(),
            timestamp: now_millis(),
        });
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
