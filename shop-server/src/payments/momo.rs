//! MoMo e-wallet (captureWallet flow)
//!
//! Both the create request and the IPN are signed with HMAC-SHA256 over
//! `key=value` pairs joined by `&`, keys in alphabetical order.

use async_trait::async_trait;
use http::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shared::order::Order;
use shared::payment::{ChargePayload, PaymentMethod, PaymentOutcome};
use shared::util::now_millis;

use super::adapter::{
    CallbackAck, PaymentAdapter, RawCallback, VerifiedCallback, attempt_ref,
    order_id_from_attempt, whole_units,
};
use super::error::PaymentError;
use super::signing::{hmac_sha256_hex, verify_hmac_sha256_hex};

const REQUEST_TYPE: &str = "captureWallet";

/// Result codes that mean "not settled yet"
const PENDING_CODES: [i64; 4] = [9000, 1000, 7000, 7002];

#[derive(Debug, Clone)]
pub struct MomoConfig {
    pub partner_code: String,
    pub access_key: String,
    pub secret_key: String,
    /// e.g. `https://test-payment.momo.vn`
    pub endpoint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    partner_code: String,
    request_id: String,
    amount: i64,
    order_id: String,
    order_info: String,
    redirect_url: String,
    ipn_url: String,
    request_type: &'static str,
    extra_data: String,
    lang: &'static str,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    result_code: i64,
    #[serde(default)]
    message: String,
    pay_url: Option<String>,
    deeplink: Option<String>,
    qr_code_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ipn {
    partner_code: String,
    order_id: String,
    request_id: String,
    amount: i64,
    #[serde(default)]
    order_info: String,
    #[serde(default)]
    order_type: String,
    trans_id: i64,
    result_code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    pay_type: String,
    response_time: i64,
    #[serde(default)]
    extra_data: String,
    signature: String,
}

impl Ipn {
    fn signature_payload(&self, access_key: &str) -> String {
        format!(
            "accessKey={}&amount={}&extraData={}&message={}&orderId={}&orderInfo={}&orderType={}&partnerCode={}&payType={}&requestId={}&responseTime={}&resultCode={}&transId={}",
            access_key,
            self.amount,
            self.extra_data,
            self.message,
            self.order_id,
            self.order_info,
            self.order_type,
            self.partner_code,
            self.pay_type,
            self.request_id,
            self.response_time,
            self.result_code,
            self.trans_id,
        )
    }
}

fn outcome_for(result_code: i64, message: &str) -> PaymentOutcome {
    if result_code == 0 {
        PaymentOutcome::Success
    } else if PENDING_CODES.contains(&result_code) {
        PaymentOutcome::Pending
    } else {
        PaymentOutcome::Failed {
            reason: format!("MoMo result {result_code}: {message}"),
        }
    }
}

pub struct MomoAdapter {
    config: MomoConfig,
    client: reqwest::Client,
    redirect_url: String,
    ipn_url: String,
}

impl MomoAdapter {
    pub fn new(config: MomoConfig, client: reqwest::Client, public_base_url: &str) -> Self {
        let base = public_base_url.trim_end_matches('/');
        Self {
            config,
            client,
            redirect_url: format!("{base}/payment/result"),
            ipn_url: format!("{base}/api/payments/momo/callback"),
        }
    }

    fn build_create_request(&self, order: &Order, now: i64) -> Result<CreateRequest, PaymentError> {
        let reference = attempt_ref(&order.id, now);
        let amount = whole_units(order.amounts.total)?;
        let order_info = format!("Thanh toan don hang {}", order.order_number);
        let extra_data = String::new();

        let payload = format!(
            "accessKey={}&amount={}&extraData={}&ipnUrl={}&orderId={}&orderInfo={}&partnerCode={}&redirectUrl={}&requestId={}&requestType={}",
            self.config.access_key,
            amount,
            extra_data,
            self.ipn_url,
            reference,
            order_info,
            self.config.partner_code,
            self.redirect_url,
            reference,
            REQUEST_TYPE,
        );
        let signature = hmac_sha256_hex(&self.config.secret_key, &payload);

        Ok(CreateRequest {
            partner_code: self.config.partner_code.clone(),
            request_id: reference.clone(),
            amount,
            order_id: reference,
            order_info,
            redirect_url: self.redirect_url.clone(),
            ipn_url: self.ipn_url.clone(),
            request_type: REQUEST_TYPE,
            extra_data,
            lang: "vi",
            signature,
        })
    }
}

#[async_trait]
impl PaymentAdapter for MomoAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Momo
    }

    async fn create_charge(&self, order: &Order) -> Result<ChargePayload, PaymentError> {
        let request = self.build_create_request(order, now_millis())?;
        let url = format!(
            "{}/v2/gateway/api/create",
            self.config.endpoint.trim_end_matches('/')
        );
        let response: CreateResponse = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if response.result_code != 0 {
            tracing::warn!(
                order_id = %order.id,
                result_code = response.result_code,
                message = %response.message,
                "MoMo rejected charge"
            );
            return Err(PaymentError::Rejected(format!(
                "MoMo {}: {}",
                response.result_code, response.message
            )));
        }

        Ok(ChargePayload {
            redirect_url: response.pay_url,
            qr_code_url: response.qr_code_url,
            deeplink: response.deeplink,
            provider_reference: Some(request.order_id),
        })
    }

    fn verify_callback(&self, raw: &RawCallback) -> Result<Option<VerifiedCallback>, PaymentError> {
        let ipn: Ipn = serde_json::from_slice(&raw.body)?;
        let payload = ipn.signature_payload(&self.config.access_key);
        if !verify_hmac_sha256_hex(&self.config.secret_key, &payload, &ipn.signature) {
            return Err(PaymentError::InvalidSignature(format!(
                "momo orderId={}",
                ipn.order_id
            )));
        }
        if ipn.partner_code != self.config.partner_code {
            return Err(PaymentError::malformed(format!(
                "unexpected partnerCode {}",
                ipn.partner_code
            )));
        }
        let order_id = order_id_from_attempt(&ipn.order_id)
            .ok_or_else(|| PaymentError::malformed(format!("bad orderId {}", ipn.order_id)))?;

        Ok(Some(VerifiedCallback {
            order_id: order_id.to_string(),
            transaction_id: ipn.trans_id.to_string(),
            amount: Decimal::from(ipn.amount),
            outcome: outcome_for(ipn.result_code, &ipn.message),
            provider_code: ipn.result_code.to_string(),
        }))
    }

    fn acknowledge(&self, ack: CallbackAck) -> (StatusCode, Value) {
        let result_code = if ack.is_settled() { 0 } else { 99 };
        (
            StatusCode::OK,
            json!({ "resultCode": result_code, "message": ack.message() }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::adapter::attempt_ref;

    const ORDER_ID: &str = "5f0c2b1e-8a7d-4e2a-9c1b-3d4e5f6a7b8c";

    fn adapter() -> MomoAdapter {
        MomoAdapter::new(
            MomoConfig {
                partner_code: "MOMOTEST".into(),
                access_key: "access".into(),
                secret_key: "secret".into(),
                endpoint: "https://test-payment.momo.vn".into(),
            },
            reqwest::Client::new(),
            "https://shop.example",
        )
    }

    fn signed_ipn(result_code: i64, secret: &str) -> Value {
        let mut ipn = json!({
            "partnerCode": "MOMOTEST",
            "orderId": attempt_ref(ORDER_ID, 1_772_668_800_000),
            "requestId": attempt_ref(ORDER_ID, 1_772_668_800_000),
            "amount": 230000,
            "orderInfo": "Thanh toan don hang ORD-20260305-000001",
            "orderType": "momo_wallet",
            "transId": 4088878653i64,
            "resultCode": result_code,
            "message": "Successful.",
            "payType": "qr",
            "responseTime": 1772668900000i64,
            "extraData": "",
            "signature": ""
        });
        let parsed: Ipn = serde_json::from_value(ipn.clone()).unwrap();
        ipn["signature"] = json!(hmac_sha256_hex(secret, &parsed.signature_payload("access")));
        ipn
    }

    fn raw(value: &Value) -> RawCallback {
        RawCallback::from_body(serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn test_success_ipn() {
        let cb = adapter()
            .verify_callback(&raw(&signed_ipn(0, "secret")))
            .unwrap()
            .unwrap();
        assert_eq!(cb.order_id, ORDER_ID);
        assert_eq!(cb.transaction_id, "4088878653");
        assert_eq!(cb.amount, Decimal::from(230_000));
        assert_eq!(cb.outcome, PaymentOutcome::Success);
    }

    #[test]
    fn test_pending_and_failed_codes() {
        let a = adapter();
        let pending = a.verify_callback(&raw(&signed_ipn(9000, "secret"))).unwrap().unwrap();
        assert_eq!(pending.outcome, PaymentOutcome::Pending);
        let failed = a.verify_callback(&raw(&signed_ipn(1006, "secret"))).unwrap().unwrap();
        assert!(matches!(failed.outcome, PaymentOutcome::Failed { .. }));
    }

    #[test]
    fn test_forged_or_tampered_ipn_is_rejected() {
        let a = adapter();
        assert!(matches!(
            a.verify_callback(&raw(&signed_ipn(0, "wrong-secret"))),
            Err(PaymentError::InvalidSignature(_))
        ));

        let mut tampered = signed_ipn(0, "secret");
        tampered["amount"] = json!(1000);
        assert!(matches!(
            a.verify_callback(&raw(&tampered)),
            Err(PaymentError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_garbage_body_is_malformed() {
        assert!(matches!(
            adapter().verify_callback(&RawCallback::from_body("not json")),
            Err(PaymentError::Malformed(_))
        ));
    }

    #[test]
    fn test_create_request_is_signed() {
        let a = adapter();
        let mut order = crate::orders::effects::test_support::order(
            PaymentMethod::Momo,
            shared::OrderStatus::Draft,
        );
        order.id = ORDER_ID.into();
        let request = a.build_create_request(&order, 1_772_668_800_000).unwrap();
        assert_eq!(request.order_id, attempt_ref(ORDER_ID, 1_772_668_800_000));
        assert_eq!(request.ipn_url, "https://shop.example/api/payments/momo/callback");
        assert_eq!(request.signature.len(), 64);
    }

    #[test]
    fn test_ack_format() {
        let (status, body) = adapter().acknowledge(CallbackAck::Duplicate);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resultCode"], 0);
        let (_, body) = adapter().acknowledge(CallbackAck::InvalidSignature);
        assert_eq!(body["resultCode"], 99);
    }
}
