//! Payment types shared between the order aggregate and the provider adapters

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 支付方式 - selects the adapter that creates charges and verifies callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Cash on delivery
    #[serde(rename = "cod")]
    Cod,
    /// Card payment through the hosted checkout
    #[serde(rename = "card")]
    Card,
    /// MoMo e-wallet
    #[serde(rename = "momo")]
    Momo,
    /// ZaloPay e-wallet
    #[serde(rename = "zalopay")]
    ZaloPay,
    /// VNPay bank gateway
    #[serde(rename = "vnpay")]
    VnPay,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cod,
        PaymentMethod::Card,
        PaymentMethod::Momo,
        PaymentMethod::ZaloPay,
        PaymentMethod::VnPay,
    ];

    /// Online methods settle through an asynchronous provider callback
    pub fn is_online(&self) -> bool {
        !matches!(self, PaymentMethod::Cod)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Card => "card",
            PaymentMethod::Momo => "momo",
            PaymentMethod::ZaloPay => "zalopay",
            PaymentMethod::VnPay => "vnpay",
        }
    }

    /// Parse the path segment used by webhook routes
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == slug)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 支付状态 (sub-state of the order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing collected yet (COD before delivery)
    #[default]
    Unpaid,
    /// Waiting for the provider callback
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Provider-agnostic result of interpreting a callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success,
    Failed { reason: String },
    Pending,
}

/// Provider transaction recorded on the order once paid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub method: PaymentMethod,
    /// Provider transaction id (MoMo transId, ZaloPay zp_trans_id, ...)
    pub transaction_id: String,
    pub amount: Decimal,
    /// Raw provider result code, kept for reconciliation reports
    pub provider_code: String,
    pub paid_at: i64,
}

/// Information handed to the confirmation entry point by an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub amount: Decimal,
    pub provider_code: String,
}

/// What the shopper needs to complete an online payment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deeplink: Option<String>,
    /// Provider-side reference (session id, zp_trans_token, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
}

impl ChargePayload {
    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            redirect_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// COD has nothing to redirect to
    pub fn is_empty(&self) -> bool {
        self.redirect_url.is_none()
            && self.qr_code_url.is_none()
            && self.deeplink.is_none()
            && self.provider_reference.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_serde_and_slug() {
        let json = serde_json::to_string(&PaymentMethod::ZaloPay).unwrap();
        assert_eq!(json, "\"zalopay\"");
        let parsed: PaymentMethod = serde_json::from_str("\"vnpay\"").unwrap();
        assert_eq!(parsed, PaymentMethod::VnPay);

        assert_eq!(PaymentMethod::from_slug("momo"), Some(PaymentMethod::Momo));
        assert_eq!(PaymentMethod::from_slug("paypal"), None);
        assert!(!PaymentMethod::Cod.is_online());
        assert!(PaymentMethod::Card.is_online());
    }

    #[test]
    fn test_outcome_tagging() {
        let json = serde_json::to_value(PaymentOutcome::Failed {
            reason: "insufficient funds".into(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["reason"], "insufficient funds");
    }

    #[test]
    fn test_charge_payload_empty() {
        assert!(ChargePayload::default().is_empty());
        assert!(!ChargePayload::redirect("https://pay.example/1").is_empty());
    }
}
