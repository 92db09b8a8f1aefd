//! Order lifecycle notifications
//!
//! Published after the triggering write has committed. Delivery is fire and
//! forget: a lost notification never affects the order.

use crate::order::OrderStatus;
use serde::{Deserialize, Serialize};

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderCreated,
    StatusChanged,
    PaymentConfirmed,
    PaymentFailed,
    Shipped,
    Delivered,
    DeliveryFailed,
    Cancelled,
    ReturnRequested,
    RefundRequested,
    Refunded,
    Completed,
}

impl NotificationKind {
    /// Kind implied by moving into `status`
    pub fn for_status(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Shipped => NotificationKind::Shipped,
            OrderStatus::DeliveredSuccess => NotificationKind::Delivered,
            OrderStatus::DeliveredFailed => NotificationKind::DeliveryFailed,
            OrderStatus::Cancelled => NotificationKind::Cancelled,
            OrderStatus::ReturnRequested => NotificationKind::ReturnRequested,
            OrderStatus::RefundRequested => NotificationKind::RefundRequested,
            OrderStatus::Refunded => NotificationKind::Refunded,
            OrderStatus::Completed => NotificationKind::Completed,
            OrderStatus::PaymentFailed => NotificationKind::PaymentFailed,
            _ => NotificationKind::StatusChanged,
        }
    }
}

/// Lifecycle event sent to the customer (and any configured sinks)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
    pub id: String,
    pub order_id: String,
    pub order_number: String,
    pub owner_id: String,
    pub kind: NotificationKind,
    pub status: OrderStatus,
    pub message: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_status() {
        assert_eq!(
            NotificationKind::for_status(OrderStatus::Shipped),
            NotificationKind::Shipped
        );
        assert_eq!(
            NotificationKind::for_status(OrderStatus::Confirmed),
            NotificationKind::StatusChanged
        );
    }

    #[test]
    fn test_notification_wire_format() {
        let n = OrderNotification {
            id: "n1".into(),
            order_id: "o1".into(),
            order_number: "ORD-20260101-000001".into(),
            owner_id: "u1".into(),
            kind: NotificationKind::PaymentConfirmed,
            status: OrderStatus::Pending,
            message: "Payment received".into(),
            timestamp: 1,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "payment_confirmed");
        assert_eq!(json["orderId"], "o1");
        assert_eq!(json["status"], "pending");
    }
}
