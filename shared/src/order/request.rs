//! Order API request and response bodies

use super::{Order, OrderStatus, ShippingAddress};
use crate::inventory::LineRequest;
use crate::payment::{ChargePayload, PaymentMethod};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// `POST /api/orders`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 100), nested)]
    pub items: Vec<LineRequest>,
    #[validate(nested)]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub voucher_code: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order: Order,
    pub payment: ChargePayload,
}

/// `PATCH /api/orders/{id}/status` (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Body of the customer action endpoints; all fields optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerActionRequest {
    #[serde(default)]
    #[validate(length(max = 500))]
    pub note: Option<String>,
    /// Required by request-return
    #[serde(default)]
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Courier-reported delivery result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    DeliveredSuccess,
    DeliveredFailed,
    PartiallyDelivered,
}

impl DeliveryOutcome {
    pub fn status(self) -> OrderStatus {
        match self {
            DeliveryOutcome::DeliveredSuccess => OrderStatus::DeliveredSuccess,
            DeliveryOutcome::DeliveredFailed => OrderStatus::DeliveredFailed,
            DeliveryOutcome::PartiallyDelivered => OrderStatus::PartiallyDelivered,
        }
    }
}

/// `POST /api/orders/{id}/delivery`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcomeRequest {
    pub outcome: DeliveryOutcome,
    #[serde(default)]
    pub note: Option<String>,
}

/// `GET /api/orders?status=`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
}
