//! Adapter lookup by payment method

use shared::order::Order;
use shared::payment::{ChargePayload, PaymentMethod};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::adapter::PaymentAdapter;
use super::card::{CardAdapter, CardConfig};
use super::cod::CodAdapter;
use super::error::PaymentError;
use super::momo::{MomoAdapter, MomoConfig};
use super::vnpay::{VnPayAdapter, VnPayConfig};
use super::zalopay::{ZaloPayAdapter, ZaloPayConfig};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// Provider credentials; a provider without credentials is not offered
#[derive(Debug, Clone, Default)]
pub struct PaymentsConfig {
    pub public_base_url: String,
    pub momo: Option<MomoConfig>,
    pub zalopay: Option<ZaloPayConfig>,
    pub vnpay: Option<VnPayConfig>,
    pub card: Option<CardConfig>,
}

#[derive(Clone)]
pub struct PaymentRegistry {
    adapters: HashMap<PaymentMethod, Arc<dyn PaymentAdapter>>,
}

impl std::fmt::Debug for PaymentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}

impl Default for PaymentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentRegistry {
    /// Registry with cash on delivery only
    pub fn new() -> Self {
        let mut registry = Self {
            adapters: HashMap::new(),
        };
        registry.register(Arc::new(CodAdapter));
        registry
    }

    pub fn from_config(config: &PaymentsConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()?;
        let base = config.public_base_url.as_str();
        let mut registry = Self::new();

        if let Some(momo) = &config.momo {
            registry.register(Arc::new(MomoAdapter::new(momo.clone(), client.clone(), base)));
        }
        if let Some(zalopay) = &config.zalopay {
            registry.register(Arc::new(ZaloPayAdapter::new(zalopay.clone(), client.clone(), base)));
        }
        if let Some(vnpay) = &config.vnpay {
            registry.register(Arc::new(VnPayAdapter::new(vnpay.clone(), base)));
        }
        if let Some(card) = &config.card {
            registry.register(Arc::new(CardAdapter::new(card.clone(), client, base)));
        }

        tracing::info!(methods = ?registry.methods(), "Payment methods registered");
        Ok(registry)
    }

    pub fn register(&mut self, adapter: Arc<dyn PaymentAdapter>) {
        self.adapters.insert(adapter.method(), adapter);
    }

    pub fn get(&self, method: PaymentMethod) -> Result<Arc<dyn PaymentAdapter>, PaymentError> {
        self.adapters
            .get(&method)
            .cloned()
            .ok_or(PaymentError::NotConfigured(method))
    }

    pub fn is_available(&self, method: PaymentMethod) -> bool {
        self.adapters.contains_key(&method)
    }

    /// Registered methods in declaration order
    pub fn methods(&self) -> Vec<PaymentMethod> {
        PaymentMethod::ALL
            .into_iter()
            .filter(|m| self.adapters.contains_key(m))
            .collect()
    }

    pub async fn create_charge(&self, order: &Order) -> Result<ChargePayload, PaymentError> {
        let adapter = self.get(order.payment_method)?;
        adapter.create_charge(order).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::effects::test_support::order;
    use shared::OrderStatus;

    #[test]
    fn test_only_configured_methods_are_registered() {
        let registry = PaymentRegistry::from_config(&PaymentsConfig {
            public_base_url: "https://shop.example".into(),
            vnpay: Some(VnPayConfig {
                tmn_code: "SHOP0001".into(),
                hash_secret: "secret".into(),
                pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into(),
            }),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(registry.methods(), vec![PaymentMethod::Cod, PaymentMethod::VnPay]);
        assert!(matches!(
            registry.get(PaymentMethod::Momo),
            Err(PaymentError::NotConfigured(PaymentMethod::Momo))
        ));
    }

    #[tokio::test]
    async fn test_cod_charge_is_empty() {
        let registry = PaymentRegistry::new();
        let payload = registry
            .create_charge(&order(PaymentMethod::Cod, OrderStatus::Pending))
            .await
            .unwrap();
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_vnpay_charge_is_a_redirect() {
        let mut registry = PaymentRegistry::new();
        registry.register(Arc::new(VnPayAdapter::new(
            VnPayConfig {
                tmn_code: "SHOP0001".into(),
                hash_secret: "secret".into(),
                pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into(),
            },
            "https://shop.example",
        )));
        let payload = registry
            .create_charge(&order(PaymentMethod::VnPay, OrderStatus::Draft))
            .await
            .unwrap();
        let url = payload.redirect_url.unwrap();
        assert!(url.starts_with("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?"));
        assert!(url.contains("vnp_SecureHash="));
    }
}
