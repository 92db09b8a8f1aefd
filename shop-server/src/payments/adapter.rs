//! Provider adapter contract
//!
//! An adapter knows one provider's wire format: how to open a charge, how
//! to authenticate and read a callback, and what the provider expects back.
//! Everything after verification goes through [`PaymentReconciler`].
//!
//! [`PaymentReconciler`]: super::PaymentReconciler

use async_trait::async_trait;
use axum::body::Bytes;
use http::{HeaderMap, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use shared::order::Order;
use shared::payment::{ChargePayload, PaymentMethod, PaymentOutcome};

use super::error::PaymentError;

/// Callback exactly as received, before any parsing
#[derive(Debug, Clone, Default)]
pub struct RawCallback {
    pub headers: HeaderMap,
    /// Raw query string without the leading `?`
    pub query: String,
    pub body: Bytes,
}

impl RawCallback {
    pub fn from_body(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn from_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Authenticated callback in canonical form
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedCallback {
    pub order_id: String,
    pub transaction_id: String,
    pub amount: Decimal,
    pub outcome: PaymentOutcome,
    /// Provider result code, kept on the order for reconciliation
    pub provider_code: String,
}

/// What the reconciler did with a callback; each adapter renders it in
/// its provider's acknowledgement format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAck {
    Processed,
    Duplicate,
    OrderNotFound,
    AmountMismatch,
    InvalidSignature,
    Malformed,
    /// Authentic but nothing to act on (pending outcome, unrelated event)
    Ignored,
    InternalError,
}

impl CallbackAck {
    /// Safe to tell the provider the callback was handled
    pub fn is_settled(self) -> bool {
        matches!(self, CallbackAck::Processed | CallbackAck::Duplicate | CallbackAck::Ignored)
    }

    pub fn message(self) -> &'static str {
        match self {
            CallbackAck::Processed => "Confirm Success",
            CallbackAck::Duplicate => "Order already confirmed",
            CallbackAck::OrderNotFound => "Order not found",
            CallbackAck::AmountMismatch => "Invalid amount",
            CallbackAck::InvalidSignature => "Invalid signature",
            CallbackAck::Malformed => "Invalid request",
            CallbackAck::Ignored => "Received",
            CallbackAck::InternalError => "Unknown error",
        }
    }
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Open a charge for `order` at the provider
    async fn create_charge(&self, order: &Order) -> Result<ChargePayload, PaymentError>;

    /// Authenticate and decode a callback.
    ///
    /// `Ok(None)` means the callback is authentic but carries no payment
    /// outcome for an order.
    fn verify_callback(&self, raw: &RawCallback) -> Result<Option<VerifiedCallback>, PaymentError>;

    /// Provider-specific acknowledgement body
    fn acknowledge(&self, ack: CallbackAck) -> (StatusCode, Value);
}

// ========== Attempt references ==========

/// Provider-side reference for one charge attempt: `{order_id}_{millis}`.
///
/// Providers reject a reused reference, so a re-created charge needs a
/// fresh one. Order ids are UUIDs and never contain `_`.
pub fn attempt_ref(order_id: &str, now_millis: i64) -> String {
    format!("{order_id}_{now_millis}")
}

pub fn order_id_from_attempt(reference: &str) -> Option<&str> {
    match reference.rsplit_once('_') {
        Some((order_id, suffix))
            if !order_id.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some(order_id)
        }
        _ => None,
    }
}

/// Whole currency units for providers that take integer VND amounts
pub(crate) fn whole_units(amount: Decimal) -> Result<i64, PaymentError> {
    use rust_decimal::prelude::ToPrimitive;
    amount
        .round()
        .to_i64()
        .ok_or_else(|| PaymentError::malformed(format!("amount out of range: {amount}")))
}
