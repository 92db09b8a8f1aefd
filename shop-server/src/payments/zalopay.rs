//! ZaloPay (v2 API)
//!
//! Charges are signed with `key1`, callbacks with `key2`. ZaloPay only
//! calls back for successful payments.

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone};
use http::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use shared::order::Order;
use shared::payment::{ChargePayload, PaymentMethod, PaymentOutcome};
use shared::util::now_millis;

use super::adapter::{CallbackAck, PaymentAdapter, RawCallback, VerifiedCallback, whole_units};
use super::error::PaymentError;
use super::signing::{hmac_sha256_hex, verify_hmac_sha256_hex};

/// Vietnam time, used for the `yyMMdd` prefix of `app_trans_id`
const VN_OFFSET_SECS: i32 = 7 * 3600;

/// Callback `type` for a regular order payment
const CALLBACK_TYPE_ORDER: i64 = 1;

#[derive(Debug, Clone)]
pub struct ZaloPayConfig {
    pub app_id: String,
    pub key1: String,
    pub key2: String,
    /// e.g. `https://sb-openapi.zalopay.vn`
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    return_code: i64,
    #[serde(default)]
    return_message: String,
    order_url: Option<String>,
    zp_trans_token: Option<String>,
    qr_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackEnvelope {
    data: String,
    mac: String,
    #[serde(rename = "type", default = "default_callback_type")]
    kind: i64,
}

fn default_callback_type() -> i64 {
    CALLBACK_TYPE_ORDER
}

#[derive(Debug, Deserialize)]
struct CallbackData {
    app_trans_id: String,
    amount: i64,
    zp_trans_id: i64,
    embed_data: String,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    order_id: String,
}

/// Form fields of a create request, `mac` last
#[derive(Debug)]
struct CreateRequest {
    app_trans_id: String,
    app_time: i64,
    amount: i64,
    app_user: String,
    embed_data: String,
    item: String,
    description: String,
    mac: String,
}

pub struct ZaloPayAdapter {
    config: ZaloPayConfig,
    client: reqwest::Client,
    redirect_url: String,
    callback_url: String,
}

impl ZaloPayAdapter {
    pub fn new(config: ZaloPayConfig, client: reqwest::Client, public_base_url: &str) -> Self {
        let base = public_base_url.trim_end_matches('/');
        Self {
            config,
            client,
            redirect_url: format!("{base}/payment/result"),
            callback_url: format!("{base}/api/payments/zalopay/callback"),
        }
    }

    fn build_create_request(&self, order: &Order, now: i64) -> Result<CreateRequest, PaymentError> {
        let offset = FixedOffset::east_opt(VN_OFFSET_SECS)
            .ok_or_else(|| PaymentError::malformed("invalid timezone offset"))?;
        let date = offset
            .timestamp_millis_opt(now)
            .single()
            .ok_or_else(|| PaymentError::malformed(format!("invalid timestamp {now}")))?
            .format("%y%m%d");
        let app_trans_id = format!("{date}_{now}");
        let amount = whole_units(order.amounts.total)?;
        let embed_data = json!({
            "order_id": order.id,
            "redirecturl": self.redirect_url,
        })
        .to_string();
        let item = "[]".to_string();

        let payload = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.config.app_id, app_trans_id, order.owner_id, amount, now, embed_data, item
        );
        let mac = hmac_sha256_hex(&self.config.key1, &payload);

        Ok(CreateRequest {
            app_trans_id,
            app_time: now,
            amount,
            app_user: order.owner_id.clone(),
            embed_data,
            item,
            description: format!("Thanh toan don hang {}", order.order_number),
            mac,
        })
    }
}

#[async_trait]
impl PaymentAdapter for ZaloPayAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::ZaloPay
    }

    async fn create_charge(&self, order: &Order) -> Result<ChargePayload, PaymentError> {
        let request = self.build_create_request(order, now_millis())?;
        let url = format!("{}/v2/create", self.config.endpoint.trim_end_matches('/'));
        let form = [
            ("app_id", self.config.app_id.clone()),
            ("app_user", request.app_user.clone()),
            ("app_trans_id", request.app_trans_id.clone()),
            ("app_time", request.app_time.to_string()),
            ("amount", request.amount.to_string()),
            ("item", request.item.clone()),
            ("embed_data", request.embed_data.clone()),
            ("description", request.description.clone()),
            ("bank_code", String::new()),
            ("callback_url", self.callback_url.clone()),
            ("mac", request.mac.clone()),
        ];
        let response: CreateResponse = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await?
            .json()
            .await?;

        if response.return_code != 1 {
            tracing::warn!(
                order_id = %order.id,
                return_code = response.return_code,
                message = %response.return_message,
                "ZaloPay rejected charge"
            );
            return Err(PaymentError::Rejected(format!(
                "ZaloPay {}: {}",
                response.return_code, response.return_message
            )));
        }

        Ok(ChargePayload {
            redirect_url: response.order_url,
            qr_code_url: response.qr_code,
            deeplink: None,
            provider_reference: response.zp_trans_token.or(Some(request.app_trans_id)),
        })
    }

    fn verify_callback(&self, raw: &RawCallback) -> Result<Option<VerifiedCallback>, PaymentError> {
        let envelope: CallbackEnvelope = serde_json::from_slice(&raw.body)?;
        if !verify_hmac_sha256_hex(&self.config.key2, &envelope.data, &envelope.mac) {
            return Err(PaymentError::InvalidSignature("zalopay callback mac".into()));
        }
        let data: CallbackData = serde_json::from_str(&envelope.data)?;
        if envelope.kind != CALLBACK_TYPE_ORDER {
            tracing::debug!(kind = envelope.kind, app_trans_id = %data.app_trans_id, "ZaloPay callback type ignored");
            return Ok(None);
        }
        let embed: EmbedData = serde_json::from_str(&data.embed_data)?;

        Ok(Some(VerifiedCallback {
            order_id: embed.order_id,
            transaction_id: data.zp_trans_id.to_string(),
            amount: Decimal::from(data.amount),
            outcome: PaymentOutcome::Success,
            provider_code: "1".to_string(),
        }))
    }

    fn acknowledge(&self, ack: CallbackAck) -> (StatusCode, Value) {
        let return_code = match ack {
            CallbackAck::Processed | CallbackAck::Ignored => 1,
            CallbackAck::Duplicate => 2,
            CallbackAck::InternalError => 0,
            CallbackAck::OrderNotFound
            | CallbackAck::AmountMismatch
            | CallbackAck::InvalidSignature
            | CallbackAck::Malformed => -1,
        };
        (
            StatusCode::OK,
            json!({ "return_code": return_code, "return_message": ack.message() }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> ZaloPayAdapter {
        ZaloPayAdapter::new(
            ZaloPayConfig {
                app_id: "2553".into(),
                key1: "key-one".into(),
                key2: "key-two".into(),
                endpoint: "https://sb-openapi.zalopay.vn".into(),
            },
            reqwest::Client::new(),
            "https://shop.example/",
        )
    }

    fn callback(key2: &str, kind: i64) -> RawCallback {
        let data = json!({
            "app_id": 2553,
            "app_trans_id": "260305_1772668800000",
            "app_time": 1772668800000i64,
            "app_user": "u1",
            "amount": 230000,
            "embed_data": "{\"order_id\":\"o1\",\"redirecturl\":\"https://shop.example/payment/result\"}",
            "item": "[]",
            "zp_trans_id": 260305000000123i64,
            "server_time": 1772668900000i64,
            "channel": 38
        })
        .to_string();
        let body = json!({
            "data": data,
            "mac": hmac_sha256_hex(key2, &data),
            "type": kind,
        });
        RawCallback::from_body(serde_json::to_vec(&body).unwrap())
    }

    #[test]
    fn test_valid_callback_is_success() {
        let cb = adapter().verify_callback(&callback("key-two", 1)).unwrap().unwrap();
        assert_eq!(cb.order_id, "o1");
        assert_eq!(cb.transaction_id, "260305000000123");
        assert_eq!(cb.amount, Decimal::from(230_000));
        assert_eq!(cb.outcome, PaymentOutcome::Success);
    }

    #[test]
    fn test_callback_signed_with_key1_is_rejected() {
        assert!(matches!(
            adapter().verify_callback(&callback("key-one", 1)),
            Err(PaymentError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_non_order_callback_is_ignored() {
        assert_eq!(adapter().verify_callback(&callback("key-two", 2)).unwrap(), None);
    }

    #[test]
    fn test_create_request_mac() {
        let a = adapter();
        let order = crate::orders::effects::test_support::order(
            PaymentMethod::ZaloPay,
            shared::OrderStatus::Draft,
        );
        // 2026-03-05T17:00:00Z is already 2026-03-06 in Vietnam
        let now = 1_772_730_000_000;
        let request = a.build_create_request(&order, now).unwrap();
        assert_eq!(request.app_trans_id, format!("260306_{now}"));
        let expected = hmac_sha256_hex(
            "key-one",
            &format!(
                "2553|{}|u1|{}|{now}|{}|[]",
                request.app_trans_id, request.amount, request.embed_data
            ),
        );
        assert_eq!(request.mac, expected);
        assert!(request.embed_data.contains("\"order_id\":\"o1\""));
        assert_eq!(a.callback_url, "https://shop.example/api/payments/zalopay/callback");
    }

    #[test]
    fn test_ack_codes() {
        let a = adapter();
        assert_eq!(a.acknowledge(CallbackAck::Processed).1["return_code"], 1);
        assert_eq!(a.acknowledge(CallbackAck::Duplicate).1["return_code"], 2);
        assert_eq!(a.acknowledge(CallbackAck::InvalidSignature).1["return_code"], -1);
        assert_eq!(a.acknowledge(CallbackAck::InternalError).1["return_code"], 0);
    }
}
