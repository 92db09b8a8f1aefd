//! VNPay (2.1.0)
//!
//! The pay URL and the IPN share one signing rule: every `vnp_*` parameter
//! except the hash itself, sorted by key, form-urlencoded, then
//! HMAC-SHA512 with the hash secret. Amounts travel ×100.

use async_trait::async_trait;
use chrono::{Duration, FixedOffset, TimeZone};
use http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shared::order::Order;
use shared::payment::{ChargePayload, PaymentMethod, PaymentOutcome};
use shared::util::now_millis;
use std::collections::BTreeMap;

use super::adapter::{
    CallbackAck, PaymentAdapter, RawCallback, VerifiedCallback, attempt_ref,
    order_id_from_attempt, whole_units,
};
use super::error::PaymentError;
use super::signing::{hmac_sha512_hex, verify_hmac_sha512_hex};

const VERSION: &str = "2.1.0";
const VN_OFFSET_SECS: i32 = 7 * 3600;
const PAY_WINDOW_MINUTES: i64 = 15;
const SECURE_HASH: &str = "vnp_SecureHash";
const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";
/// 交易成功
const SUCCESS: &str = "00";
/// Deducted, flagged as suspicious by the bank
const SUSPICIOUS: &str = "07";

#[derive(Debug, Clone)]
pub struct VnPayConfig {
    pub tmn_code: String,
    pub hash_secret: String,
    /// e.g. `https://sandbox.vnpayment.vn/paymentv2/vpcpay.html`
    pub pay_url: String,
}

fn encode(params: &BTreeMap<String, String>) -> Result<String, PaymentError> {
    serde_urlencoded::to_string(params).map_err(|e| PaymentError::malformed(e.to_string()))
}

fn outcome_for(response_code: &str, transaction_status: &str) -> PaymentOutcome {
    if response_code == SUCCESS && transaction_status == SUCCESS {
        PaymentOutcome::Success
    } else if response_code == SUSPICIOUS {
        PaymentOutcome::Pending
    } else {
        PaymentOutcome::Failed {
            reason: format!("VNPay response {response_code}, status {transaction_status}"),
        }
    }
}

pub struct VnPayAdapter {
    config: VnPayConfig,
    return_url: String,
}

impl VnPayAdapter {
    pub fn new(config: VnPayConfig, public_base_url: &str) -> Self {
        Self {
            config,
            return_url: format!("{}/payment/result", public_base_url.trim_end_matches('/')),
        }
    }

    fn payment_url(&self, order: &Order, now: i64) -> Result<String, PaymentError> {
        let offset = FixedOffset::east_opt(VN_OFFSET_SECS)
            .ok_or_else(|| PaymentError::malformed("invalid timezone offset"))?;
        let created = offset
            .timestamp_millis_opt(now)
            .single()
            .ok_or_else(|| PaymentError::malformed(format!("invalid timestamp {now}")))?;
        let expires = created + Duration::minutes(PAY_WINDOW_MINUTES);

        let params: BTreeMap<String, String> = [
            ("vnp_Version", VERSION.to_string()),
            ("vnp_Command", "pay".to_string()),
            ("vnp_TmnCode", self.config.tmn_code.clone()),
            ("vnp_Amount", (whole_units(order.amounts.total)? * 100).to_string()),
            ("vnp_CurrCode", "VND".to_string()),
            ("vnp_TxnRef", attempt_ref(&order.id, now)),
            ("vnp_OrderInfo", format!("Thanh toan don hang {}", order.order_number)),
            ("vnp_OrderType", "other".to_string()),
            ("vnp_Locale", "vn".to_string()),
            ("vnp_ReturnUrl", self.return_url.clone()),
            ("vnp_IpAddr", "127.0.0.1".to_string()),
            ("vnp_CreateDate", created.format("%Y%m%d%H%M%S").to_string()),
            ("vnp_ExpireDate", expires.format("%Y%m%d%H%M%S").to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let query = encode(&params)?;
        let hash = hmac_sha512_hex(&self.config.hash_secret, &query);
        Ok(format!("{}?{query}&{SECURE_HASH}={hash}", self.config.pay_url))
    }
}

#[async_trait]
impl PaymentAdapter for VnPayAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::VnPay
    }

    async fn create_charge(&self, order: &Order) -> Result<ChargePayload, PaymentError> {
        self.payment_url(order, now_millis()).map(ChargePayload::redirect)
    }

    fn verify_callback(&self, raw: &RawCallback) -> Result<Option<VerifiedCallback>, PaymentError> {
        let mut params: BTreeMap<String, String> = serde_urlencoded::from_str(&raw.query)
            .map_err(|e| PaymentError::malformed(e.to_string()))?;
        let signature = params
            .remove(SECURE_HASH)
            .ok_or_else(|| PaymentError::InvalidSignature("vnpay: missing vnp_SecureHash".into()))?;
        params.remove(SECURE_HASH_TYPE);
        params.retain(|k, _| k.starts_with("vnp_"));

        let signed = encode(&params)?;
        if !verify_hmac_sha512_hex(&self.config.hash_secret, &signed, &signature) {
            return Err(PaymentError::InvalidSignature(format!(
                "vnpay TxnRef={}",
                params.get("vnp_TxnRef").map(String::as_str).unwrap_or("")
            )));
        }

        let field = |name: &str| {
            params
                .get(name)
                .cloned()
                .ok_or_else(|| PaymentError::malformed(format!("missing {name}")))
        };
        if field("vnp_TmnCode")? != self.config.tmn_code {
            return Err(PaymentError::malformed("unexpected vnp_TmnCode"));
        }
        let txn_ref = field("vnp_TxnRef")?;
        let order_id = order_id_from_attempt(&txn_ref)
            .ok_or_else(|| PaymentError::malformed(format!("bad vnp_TxnRef {txn_ref}")))?;
        let amount: i64 = field("vnp_Amount")?
            .parse()
            .map_err(|_| PaymentError::malformed("vnp_Amount is not a number"))?;
        let response_code = field("vnp_ResponseCode")?;
        let transaction_status = params
            .get("vnp_TransactionStatus")
            .cloned()
            .unwrap_or_default();

        Ok(Some(VerifiedCallback {
            order_id: order_id.to_string(),
            transaction_id: field("vnp_TransactionNo")?,
            amount: Decimal::new(amount, 2),
            outcome: outcome_for(&response_code, &transaction_status),
            provider_code: response_code,
        }))
    }

    fn acknowledge(&self, ack: CallbackAck) -> (StatusCode, Value) {
        let code = match ack {
            CallbackAck::Processed | CallbackAck::Ignored => "00",
            CallbackAck::Duplicate => "02",
            CallbackAck::OrderNotFound => "01",
            CallbackAck::AmountMismatch => "04",
            CallbackAck::InvalidSignature => "97",
            CallbackAck::Malformed | CallbackAck::InternalError => "99",
        };
        (StatusCode::OK, json!({ "RspCode": code, "Message": ack.message() }))
    }
}
