//! Inventory and reservation types
//!
//! Stock is tracked per [`StockKey`]: a bare product, or a product variant
//! when the product has variants. Variant stock is independent of the
//! product-level counter.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Identifies one stock counter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockKey {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
}

impl StockKey {
    pub fn product(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: None,
        }
    }

    pub fn variant(product_id: impl Into<String>, variant_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: Some(variant_id.into()),
        }
    }

    /// Storage key: `product` or `product#variant`
    pub fn storage_key(&self) -> String {
        match &self.variant_id {
            Some(v) => format!("{}#{}", self.product_id, v),
            None => self.product_id.clone(),
        }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Catalog projection: only what inventory and pricing need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: String,
    pub name: String,
    /// Overrides the product price when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl Product {
    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    pub fn find_variant(&self, variant_id: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }
}

/// Time-bounded hold on stock for one cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub owner_id: String,
    pub quantity: u32,
    pub created_at: i64,
    pub expires_at: i64,
    pub active: bool,
}

impl Reservation {
    pub fn stock_key(&self) -> StockKey {
        StockKey {
            product_id: self.product_id.clone(),
            variant_id: self.variant_id.clone(),
        }
    }

    /// Counts against available stock
    pub fn is_live(&self, now: i64) -> bool {
        self.active && self.expires_at > now
    }
}

/// One requested line (cart line or order line)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    #[validate(length(min = 1, max = 64))]
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: u32,
}

impl LineRequest {
    pub fn new(product_id: impl Into<String>, variant_id: Option<&str>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: variant_id.map(str::to_string),
            quantity,
        }
    }

    pub fn stock_key(&self) -> StockKey {
        StockKey {
            product_id: self.product_id.clone(),
            variant_id: self.variant_id.clone(),
        }
    }
}

/// Why a line cannot be fulfilled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    InsufficientStock,
    ProductNotFound,
    ProductInactive,
    VariantNotFound,
    VariantRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub requested: u32,
    pub available: u64,
    pub reason: UnavailableReason,
}

/// Result of `check_availability`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub available: bool,
    pub unavailable_items: Vec<UnavailableItem>,
}

impl AvailabilityReport {
    pub fn from_items(unavailable_items: Vec<UnavailableItem>) -> Self {
        Self {
            available: unavailable_items.is_empty(),
            unavailable_items,
        }
    }
}

/// Result of `deduct_inventory`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionReport {
    pub success: bool,
    pub errors: Vec<UnavailableItem>,
}

/// Result of `restore_inventory`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub success: bool,
    /// The order was already restored, nothing changed
    pub skipped: bool,
}

/// Stock projection for the cart UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub on_hand: u64,
    pub reserved_by_others: u64,
    pub available: u64,
}

// ============================================================================
// Admin requests
// ============================================================================

/// Set absolute on-hand quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStockRequest {
    #[serde(default)]
    pub variant_id: Option<String>,
    pub on_hand: u64,
}

/// Restock or shrink by a delta, floored at zero
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    #[serde(default)]
    pub variant_id: Option<String>,
    pub delta: i64,
}

/// Cart line update; quantity 0 releases the hold
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    #[validate(length(min = 1, max = 64))]
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[validate(range(max = 10000))]
    pub quantity: u32,
}

/// One cart line as returned by `GET /api/cart`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub reservation: Reservation,
    pub available: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_key_storage_key() {
        assert_eq!(StockKey::product("tee").storage_key(), "tee");
        assert_eq!(StockKey::variant("tee", "xl").storage_key(), "tee#xl");
        assert_eq!(
            LineRequest::new("tee", Some("xl"), 2).stock_key(),
            StockKey::variant("tee", "xl")
        );
    }

    #[test]
    fn test_reservation_liveness() {
        let r = Reservation {
            id: "r1".into(),
            product_id: "tee".into(),
            variant_id: None,
            owner_id: "u1".into(),
            quantity: 2,
            created_at: 0,
            expires_at: 1_000,
            active: true,
        };
        assert!(r.is_live(999));
        assert!(!r.is_live(1_000));
        assert!(!Reservation { active: false, ..r }.is_live(0));
    }

    #[test]
    fn test_line_request_validation() {
        assert!(LineRequest::new("tee", None, 1).validate().is_ok());
        assert!(LineRequest::new("tee", None, 0).validate().is_err());
        assert!(LineRequest::new("", None, 1).validate().is_err());
    }

    #[test]
    fn test_availability_report_serializes_camel_case() {
        let report = AvailabilityReport::from_items(vec![UnavailableItem {
            product_id: "tee".into(),
            variant_id: None,
            requested: 3,
            available: 2,
            reason: UnavailableReason::InsufficientStock,
        }]);
        assert!(!report.available);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["unavailableItems"][0]["reason"], "insufficient_stock");
    }
}
