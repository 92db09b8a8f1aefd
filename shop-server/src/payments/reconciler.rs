//! Provider-agnostic callback pipeline
//!
//! ```text
//! raw callback → adapter.verify_callback ─┬─ invalid  → security_log, ack
//!                                         └─ verified → confirm / fail entry point → ack
//! ```
//!
//! Nothing touches the order store before the signature has been checked.

use http::StatusCode;
use serde_json::Value;
use shared::payment::{PaymentInfo, PaymentMethod, PaymentOutcome};

use super::adapter::{CallbackAck, PaymentAdapter, RawCallback, VerifiedCallback};
use super::error::PaymentError;
use super::registry::PaymentRegistry;
use crate::orders::{OrderError, OrdersManager, PaymentConfirmation, PaymentFailureOutcome};
use crate::security_log;

#[derive(Debug, Clone)]
pub struct PaymentReconciler {
    registry: PaymentRegistry,
    orders: OrdersManager,
}

impl PaymentReconciler {
    pub fn new(registry: PaymentRegistry, orders: OrdersManager) -> Self {
        Self { registry, orders }
    }

    pub fn registry(&self) -> &PaymentRegistry {
        &self.registry
    }

    /// Verify, apply and render the provider acknowledgement.
    ///
    /// Errors only when `method` has no callback endpoint at all.
    pub fn handle_callback(
        &self,
        method: PaymentMethod,
        raw: &RawCallback,
    ) -> Result<(StatusCode, Value), PaymentError> {
        if !method.is_online() {
            return Err(PaymentError::CallbacksNotSupported(method));
        }
        let adapter = self.registry.get(method)?;
        let ack = self.reconcile(adapter.as_ref(), raw);
        Ok(adapter.acknowledge(ack))
    }

    fn reconcile(&self, adapter: &dyn PaymentAdapter, raw: &RawCallback) -> CallbackAck {
        let method = adapter.method();
        match adapter.verify_callback(raw) {
            Ok(Some(callback)) => self.apply(method, callback),
            Ok(None) => CallbackAck::Ignored,
            Err(PaymentError::InvalidSignature(detail)) => {
                security_log!(WARN, "callback_signature_invalid", provider = %method, detail = %detail);
                CallbackAck::InvalidSignature
            }
            Err(PaymentError::Malformed(detail)) => {
                tracing::warn!(provider = %method, detail = %detail, "Rejected malformed payment callback");
                CallbackAck::Malformed
            }
            Err(e) => {
                tracing::error!(provider = %method, error = %e, "Payment callback verification failed");
                CallbackAck::InternalError
            }
        }
    }

    /// Feed a verified callback into the order entry points
    pub fn apply(&self, method: PaymentMethod, callback: VerifiedCallback) -> CallbackAck {
        let order_id = callback.order_id.as_str();
        match &callback.outcome {
            PaymentOutcome::Success => {
                let info = PaymentInfo {
                    method,
                    transaction_id: callback.transaction_id.clone(),
                    amount: callback.amount,
                    provider_code: callback.provider_code.clone(),
                };
                match self.orders.confirm_order_after_payment(order_id, &info) {
                    Ok(PaymentConfirmation::Confirmed(_)) => CallbackAck::Processed,
                    Ok(PaymentConfirmation::Duplicate(_)) => CallbackAck::Duplicate,
                    Err(e) => ack_for_error(method, order_id, e),
                }
            }
            PaymentOutcome::Failed { reason } => {
                match self.orders.handle_payment_failed(order_id, method, reason) {
                    Ok(PaymentFailureOutcome::Recorded(_)) => CallbackAck::Processed,
                    Ok(PaymentFailureOutcome::AlreadyFailed) => CallbackAck::Duplicate,
                    Ok(PaymentFailureOutcome::Ignored(_)) => CallbackAck::Ignored,
                    Err(e) => ack_for_error(method, order_id, e),
                }
            }
            PaymentOutcome::Pending => {
                tracing::info!(
                    order_id = %order_id,
                    provider = %method,
                    code = %callback.provider_code,
                    "Payment still pending at provider"
                );
                CallbackAck::Ignored
            }
        }
    }
}

fn ack_for_error(method: PaymentMethod, order_id: &str, err: OrderError) -> CallbackAck {
    match err {
        OrderError::NotFound(_) => {
            tracing::warn!(order_id = %order_id, provider = %method, "Payment callback for unknown order");
            CallbackAck::OrderNotFound
        }
        OrderError::AmountMismatch { expected, received } => {
            security_log!(
                WARN,
                "callback_amount_mismatch",
                order_id = %order_id,
                provider = %method,
                expected = %expected,
                received = %received
            );
            CallbackAck::AmountMismatch
        }
        e => {
            tracing::error!(order_id = %order_id, provider = %method, error = %e, "Failed to apply payment callback");
            CallbackAck::InternalError
        }
    }
}
