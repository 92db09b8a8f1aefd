use rust_decimal::Decimal;
use shared::order::OrderStatus;
use shared::{AppError, ErrorCode};
use thiserror::Error;

use crate::db::{StorageError, forward_redb_errors};
use crate::inventory::InventoryError;

/// Order lifecycle errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order {0} does not belong to the caller")]
    NotOwned(String),

    #[error("Transition {from} -> {to} is not allowed")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order in {0} can only be moved by the customer or courier")]
    NotAdminControllable(OrderStatus),

    #[error("Order {0} already paid")]
    AlreadyPaid(String),

    #[error("Refund already requested for order {0}")]
    RefundAlreadyRequested(String),

    #[error("Refund not allowed: {0}")]
    RefundNotAllowed(String),

    #[error("Delivery retried {0} times already")]
    DeliveryRetryExhausted(u32),

    #[error("Paid amount {received} does not match order total {expected}")]
    AmountMismatch { expected: Decimal, received: Decimal },

    #[error("Order {0} does not take online payment")]
    PaymentNotRequired(String),

    #[error("Voucher not found: {0}")]
    VoucherNotFound(String),

    #[error("Voucher {0} cannot be applied")]
    VoucherNotApplicable(String),

    #[error("{0}")]
    Validation(String),
}

pub type OrderResult<T> = Result<T, OrderError>;

forward_redb_errors!(OrderError);

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Storage(e) => e.into(),
            OrderError::Inventory(e) => e.into(),
            OrderError::NotFound(id) => {
                AppError::new(ErrorCode::OrderNotFound).with_detail("orderId", id)
            }
            OrderError::NotOwned(id) => {
                AppError::new(ErrorCode::OrderNotOwned).with_detail("orderId", id)
            }
            OrderError::InvalidTransition { from, to } => {
                AppError::new(ErrorCode::InvalidStatusTransition)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            OrderError::NotAdminControllable(status) => {
                AppError::new(ErrorCode::StatusNotAdminControllable)
                    .with_detail("status", status.as_str())
            }
            OrderError::AlreadyPaid(id) => {
                AppError::new(ErrorCode::OrderAlreadyPaid).with_detail("orderId", id)
            }
            OrderError::RefundAlreadyRequested(id) => {
                AppError::new(ErrorCode::RefundAlreadyRequested).with_detail("orderId", id)
            }
            OrderError::RefundNotAllowed(msg) => {
                AppError::with_message(ErrorCode::RefundNotAllowed, msg)
            }
            OrderError::DeliveryRetryExhausted(count) => {
                AppError::new(ErrorCode::DeliveryRetryExhausted).with_detail("retryCount", count)
            }
            OrderError::AmountMismatch { expected, received } => {
                AppError::new(ErrorCode::PaymentAmountMismatch)
                    .with_detail("expected", expected.to_string())
                    .with_detail("received", received.to_string())
            }
            OrderError::PaymentNotRequired(id) => {
                AppError::new(ErrorCode::PaymentNotRequired).with_detail("orderId", id)
            }
            OrderError::VoucherNotFound(code) => {
                AppError::new(ErrorCode::VoucherNotFound).with_detail("code", code)
            }
            OrderError::VoucherNotApplicable(code) => {
                AppError::new(ErrorCode::VoucherNotApplicable).with_detail("code", code)
            }
            OrderError::Validation(msg) => AppError::validation(msg),
        }
    }
}
