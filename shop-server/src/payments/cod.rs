use async_trait::async_trait;
use http::StatusCode;
use serde_json::{Value, json};
use shared::order::Order;
use shared::payment::{ChargePayload, PaymentMethod};

use super::adapter::{CallbackAck, PaymentAdapter, RawCallback, VerifiedCallback};
use super::error::PaymentError;

/// Cash on delivery: nothing to charge up front, no callbacks
#[derive(Debug, Default, Clone, Copy)]
pub struct CodAdapter;

#[async_trait]
impl PaymentAdapter for CodAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Cod
    }

    async fn create_charge(&self, _order: &Order) -> Result<ChargePayload, PaymentError> {
        Ok(ChargePayload::default())
    }

    fn verify_callback(&self, _raw: &RawCallback) -> Result<Option<VerifiedCallback>, PaymentError> {
        Err(PaymentError::CallbacksNotSupported(PaymentMethod::Cod))
    }

    fn acknowledge(&self, _ack: CallbackAck) -> (StatusCode, Value) {
        (StatusCode::NOT_FOUND, json!({ "message": "cash on delivery has no callbacks" }))
    }
}
