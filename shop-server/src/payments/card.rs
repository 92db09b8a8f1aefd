//! Card payments through Stripe Checkout (REST API, no SDK)

use async_trait::async_trait;
use http::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use shared::order::Order;
use shared::payment::{ChargePayload, PaymentMethod, PaymentOutcome};

use super::adapter::{CallbackAck, PaymentAdapter, RawCallback, VerifiedCallback, whole_units};
use super::error::PaymentError;
use super::signing::verify_hmac_sha256_hex;

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";
const SIGNATURE_HEADER: &str = "stripe-signature";
/// Reject events older than 5 minutes
const TOLERANCE_SECS: i64 = 300;
/// Currencies Stripe takes in whole units
const ZERO_DECIMAL_CURRENCIES: [&str; 3] = ["vnd", "jpy", "krw"];

#[derive(Debug, Clone)]
pub struct CardConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    /// Lowercase ISO code, `vnd` by default
    pub currency: String,
}

/// Verify a `Stripe-Signature` header (`t=...,v1=...`) against the raw body
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now_secs: i64,
) -> Result<(), PaymentError> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }
    if timestamp.is_empty() || signatures.is_empty() {
        return Err(PaymentError::InvalidSignature("invalid Stripe-Signature header".into()));
    }

    let body = std::str::from_utf8(payload)
        .map_err(|_| PaymentError::malformed("webhook body is not UTF-8"))?;
    let signed_payload = format!("{timestamp}.{body}");
    if !signatures
        .iter()
        .any(|sig| verify_hmac_sha256_hex(secret, &signed_payload, sig))
    {
        return Err(PaymentError::InvalidSignature("webhook signature mismatch".into()));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| PaymentError::InvalidSignature("invalid timestamp".into()))?;
    if (now_secs - ts).abs() > TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature("webhook timestamp too old".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: Value,
}

fn metadata_order_id(object: &Value) -> Option<String> {
    object["metadata"]["order_id"]
        .as_str()
        .or_else(|| object["client_reference_id"].as_str())
        .map(String::from)
}

pub struct CardAdapter {
    config: CardConfig,
    client: reqwest::Client,
    success_url: String,
    cancel_url: String,
}

impl CardAdapter {
    pub fn new(config: CardConfig, client: reqwest::Client, public_base_url: &str) -> Self {
        let base = public_base_url.trim_end_matches('/');
        Self {
            config,
            client,
            success_url: format!("{base}/payment/result?status=success"),
            cancel_url: format!("{base}/payment/result?status=cancelled"),
        }
    }

    fn is_zero_decimal(&self) -> bool {
        ZERO_DECIMAL_CURRENCIES.contains(&self.config.currency.as_str())
    }

    fn to_minor(&self, amount: Decimal) -> Result<i64, PaymentError> {
        if self.is_zero_decimal() {
            whole_units(amount)
        } else {
            whole_units(amount * Decimal::ONE_HUNDRED)
        }
    }

    fn from_minor(&self, minor: i64) -> Decimal {
        if self.is_zero_decimal() {
            Decimal::from(minor)
        } else {
            Decimal::new(minor, 2)
        }
    }

    fn interpret(&self, event: Event) -> Result<Option<VerifiedCallback>, PaymentError> {
        let object = &event.data.object;
        let outcome = match event.kind.as_str() {
            "checkout.session.completed" => {
                if object["payment_status"].as_str() == Some("paid") {
                    PaymentOutcome::Success
                } else {
                    PaymentOutcome::Pending
                }
            }
            "checkout.session.async_payment_succeeded" => PaymentOutcome::Success,
            "checkout.session.async_payment_failed" => PaymentOutcome::Failed {
                reason: "Asynchronous card payment failed".into(),
            },
            "checkout.session.expired" => PaymentOutcome::Failed {
                reason: "Checkout session expired".into(),
            },
            // 一次卡被拒; Checkout session 仍然有效, 客户可以换卡重试
            "payment_intent.payment_failed" => {
                tracing::info!(
                    decline = %object["last_payment_error"]["message"].as_str().unwrap_or("unknown"),
                    "Card attempt declined, session still open"
                );
                PaymentOutcome::Pending
            }
            other => {
                tracing::debug!(event_type = %other, "Unhandled Stripe event");
                return Ok(None);
            }
        };

        let order_id = metadata_order_id(object)
            .ok_or_else(|| PaymentError::malformed(format!("{} without order_id", event.kind)))?;
        let is_session = event.kind.starts_with("checkout.session.");
        let transaction_id = if is_session {
            object["payment_intent"]
                .as_str()
                .or_else(|| object["id"].as_str())
        } else {
            object["id"].as_str()
        }
        .ok_or_else(|| PaymentError::malformed("event object without id"))?
        .to_string();
        let minor = if is_session {
            object["amount_total"].as_i64()
        } else {
            object["amount"].as_i64()
        }
        .unwrap_or_default();

        Ok(Some(VerifiedCallback {
            order_id,
            transaction_id,
            amount: self.from_minor(minor),
            outcome,
            provider_code: event.kind,
        }))
    }
}

#[async_trait]
impl PaymentAdapter for CardAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Card
    }

    async fn create_charge(&self, order: &Order) -> Result<ChargePayload, PaymentError> {
        let unit_amount = self.to_minor(order.amounts.total)?.to_string();
        let name = format!("Order {}", order.order_number);
        let resp: Value = self
            .client
            .post(CHECKOUT_SESSIONS_URL)
            .basic_auth(&self.config.secret_key, None::<&str>)
            .form(&[
                ("mode", "payment"),
                ("success_url", self.success_url.as_str()),
                ("cancel_url", self.cancel_url.as_str()),
                ("client_reference_id", order.id.as_str()),
                ("metadata[order_id]", order.id.as_str()),
                ("payment_intent_data[metadata][order_id]", order.id.as_str()),
                ("line_items[0][quantity]", "1"),
                ("line_items[0][price_data][currency]", self.config.currency.as_str()),
                ("line_items[0][price_data][unit_amount]", unit_amount.as_str()),
                ("line_items[0][price_data][product_data][name]", name.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        match (resp["url"].as_str(), resp["id"].as_str()) {
            (Some(url), Some(id)) => Ok(ChargePayload {
                redirect_url: Some(url.to_string()),
                provider_reference: Some(id.to_string()),
                ..Default::default()
            }),
            _ => {
                tracing::warn!(order_id = %order.id, response = %resp, "Stripe checkout session failed");
                Err(PaymentError::Rejected(
                    resp["error"]["message"]
                        .as_str()
                        .unwrap_or("checkout session not created")
                        .to_string(),
                ))
            }
        }
    }

    fn verify_callback(&self, raw: &RawCallback) -> Result<Option<VerifiedCallback>, PaymentError> {
        let sig_header = raw
            .headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PaymentError::InvalidSignature("missing Stripe-Signature".into()))?;
        verify_webhook_signature(
            &raw.body,
            sig_header,
            &self.config.webhook_secret,
            chrono::Utc::now().timestamp(),
        )?;
        let event: Event = serde_json::from_slice(&raw.body)?;
        self.interpret(event)
    }

    fn acknowledge(&self, ack: CallbackAck) -> (StatusCode, Value) {
        (StatusCode::OK, json!({ "received": true, "result": ack.message() }))
    }
}
