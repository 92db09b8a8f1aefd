use serde::{Deserialize, Serialize};
use std::fmt;

/// 订单状态
///
/// Which edges between these states are legal, and who may take them, is
/// decided by the server's state machine; this type only names the states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Online payment not yet received
    Draft,
    /// Awaiting admin confirmation
    Pending,
    Confirmed,
    Processing,
    Shipped,
    DeliveredSuccess,
    DeliveredFailed,
    PartiallyDelivered,
    ReturnRequested,
    Returned,
    ReturnPending,
    ReturnConfirmed,
    ReturnProcessing,
    ReturnCompleted,
    RefundRequested,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    PaymentFailed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 20] = [
        OrderStatus::Draft,
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::DeliveredSuccess,
        OrderStatus::DeliveredFailed,
        OrderStatus::PartiallyDelivered,
        OrderStatus::ReturnRequested,
        OrderStatus::Returned,
        OrderStatus::ReturnPending,
        OrderStatus::ReturnConfirmed,
        OrderStatus::ReturnProcessing,
        OrderStatus::ReturnCompleted,
        OrderStatus::RefundRequested,
        OrderStatus::OnHold,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
        OrderStatus::PaymentFailed,
    ];

    /// No outbound edges at all
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// States that release deducted stock back to the ledger
    pub fn restores_inventory(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::DeliveredSuccess => "delivered_success",
            OrderStatus::DeliveredFailed => "delivered_failed",
            OrderStatus::PartiallyDelivered => "partially_delivered",
            OrderStatus::ReturnRequested => "return_requested",
            OrderStatus::Returned => "returned",
            OrderStatus::ReturnPending => "return_pending",
            OrderStatus::ReturnConfirmed => "return_confirmed",
            OrderStatus::ReturnProcessing => "return_processing",
            OrderStatus::ReturnCompleted => "return_completed",
            OrderStatus::RefundRequested => "refund_requested",
            OrderStatus::OnHold => "on_hold",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::PaymentFailed => "payment_failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
