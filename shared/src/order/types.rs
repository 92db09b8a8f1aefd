//! Order document types

use super::OrderStatus;
use crate::inventory::LineRequest;
use crate::payment::{PaymentMethod, PaymentResult, PaymentStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Items & amounts
// ============================================================================

/// Order line, priced from the catalog at creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn as_line(&self) -> LineRequest {
        LineRequest {
            product_id: self.product_id.clone(),
            variant_id: self.variant_id.clone(),
            quantity: self.quantity,
        }
    }
}

/// 金额汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAmounts {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Idempotency guard for stock deduction and restoration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStatus {
    pub deducted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deducted_at: Option<i64>,
    pub restored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<i64>,
}

impl InventoryStatus {
    /// Stock was taken and has not been given back yet
    pub fn needs_restore(&self) -> bool {
        self.deducted && !self.restored
    }
}

// ============================================================================
// Shipping / delivery
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 255))]
    pub address_line: String,
    #[serde(default)]
    pub ward: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub district: String,
    #[validate(length(min = 1, max = 100))]
    pub province: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPerson {
    pub name: String,
    pub phone: String,
    /// Synthesized on ship because nobody was assigned
    #[serde(default)]
    pub placeholder: bool,
}

impl DeliveryPerson {
    pub fn placeholder() -> Self {
        Self {
            name: "Unassigned courier".to_string(),
            phone: String::new(),
            placeholder: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub reason: String,
    pub requested_at: i64,
}

// ============================================================================
// Status history
// ============================================================================

/// 历史记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    StatusChange,
    PaymentSuccess,
    PaymentFailed,
}

/// Who caused a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Customer,
    Admin,
    Courier,
    /// Payment provider callback
    Payment,
    /// Background sweeper
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub kind: HistoryKind,
    pub status: OrderStatus,
    #[serde(default)]
    pub note: String,
    pub actor: Actor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    pub date: i64,
}

// ============================================================================
// Order
// ============================================================================

/// Input for [`Order::new`]; everything the controller resolved up front
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: String,
    pub order_number: String,
    pub owner_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub amounts: OrderAmounts,
    pub voucher_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
}

/// 订单
///
/// `status_history` is private: entries can be appended through the
/// recording methods but never edited or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub owner_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub amounts: OrderAmounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub is_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_result: Option<PaymentResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_failure_reason: Option<String>,
    /// Last time a provider charge was (re)created via `/pay`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_charge_at: Option<i64>,
    status_history: Vec<StatusHistoryEntry>,
    pub inventory_status: InventoryStatus,
    #[serde(default)]
    pub retry_delivery_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_request: Option<ReturnRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_person: Option<DeliveryPerson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Online methods start in `draft` until the provider confirms;
    /// COD goes straight to `pending`.
    pub fn new(init: NewOrder, actor_id: &str, now: i64) -> Self {
        let status = if init.payment_method.is_online() {
            OrderStatus::Draft
        } else {
            OrderStatus::Pending
        };
        let payment_status = if init.payment_method.is_online() {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Unpaid
        };
        let mut order = Self {
            id: init.id,
            order_number: init.order_number,
            owner_id: init.owner_id,
            items: init.items,
            shipping_address: init.shipping_address,
            amounts: init.amounts,
            voucher_code: init.voucher_code,
            payment_method: init.payment_method,
            status,
            payment_status,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            payment_failure_reason: None,
            last_charge_at: None,
            status_history: Vec::new(),
            inventory_status: InventoryStatus::default(),
            retry_delivery_count: 0,
            return_request: None,
            delivery_person: None,
            note: init.note,
            delivered_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };
        order.push_history(
            HistoryKind::StatusChange,
            status,
            "Order placed",
            Actor::Customer,
            Some(actor_id),
            now,
        );
        order
    }

    /// Start of the current payment window: the latest charge attempt,
    /// or placement when no charge was re-created
    pub fn payment_window_start(&self) -> i64 {
        self.last_charge_at.unwrap_or(self.created_at)
    }

    /// Unpaid and still waiting on a provider
    pub fn awaits_payment(&self) -> bool {
        !self.is_paid && matches!(self.status, OrderStatus::Draft | OrderStatus::PaymentFailed)
    }

    pub fn status_history(&self) -> &[StatusHistoryEntry] {
        &self.status_history
    }

    /// Move to `status` and append the matching history entry
    pub fn record_status(
        &mut self,
        status: OrderStatus,
        note: impl Into<String>,
        actor: Actor,
        actor_id: Option<&str>,
        now: i64,
    ) {
        self.status = status;
        self.push_history(HistoryKind::StatusChange, status, note, actor, actor_id, now);
    }

    /// Append a payment audit entry without touching `status`
    pub fn record_payment_event(&mut self, kind: HistoryKind, note: impl Into<String>, now: i64) {
        let status = self.status;
        self.push_history(kind, status, note, Actor::Payment, None, now);
    }

    /// Number of history entries that moved the order into `status`
    pub fn times_entered(&self, status: OrderStatus) -> usize {
        self.status_history
            .iter()
            .filter(|e| e.kind == HistoryKind::StatusChange && e.status == status)
            .count()
    }

    pub fn count_history(&self, kind: HistoryKind) -> usize {
        self.status_history.iter().filter(|e| e.kind == kind).count()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub fn lines(&self) -> Vec<LineRequest> {
        self.items.iter().map(OrderItem::as_line).collect()
    }

    fn push_history(
        &mut self,
        kind: HistoryKind,
        status: OrderStatus,
        note: impl Into<String>,
        actor: Actor,
        actor_id: Option<&str>,
        now: i64,
    ) {
        self.status_history.push(StatusHistoryEntry {
            kind,
            status,
            note: note.into(),
            actor,
            actor_id: actor_id.map(str::to_string),
            date: now,
        });
        self.updated_at = now;
    }
}

// ============================================================================
// Vouchers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoucherDiscount {
    /// Percent of the subtotal, 0-100
    Percent { percent: Decimal },
    Fixed { amount: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    pub discount: VoucherDiscount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_subtotal: Option<Decimal>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
