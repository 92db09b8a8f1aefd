//! Order pricing using rust_decimal
//!
//! Unit prices always come from the catalog projection, never the client.
//!
//! ```text
//! subtotal = Σ unit_price × quantity
//! discount = voucher(subtotal), capped at subtotal
//! shipping = 0 if subtotal ≥ threshold else fee
//! tax      = round((subtotal − discount) × rate%)
//! total    = subtotal − discount + shipping + tax
//! ```

use rust_decimal::prelude::*;
use shared::order::{OrderAmounts, OrderItem, Voucher, VoucherDiscount};

use super::error::{OrderError, OrderResult};
use crate::inventory::ResolvedLine;

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub tax_rate_percent: Decimal,
    pub shipping_fee: Decimal,
    pub free_shipping_threshold: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate_percent: Decimal::ZERO,
            shipping_fee: Decimal::new(30_000, 0),
            free_shipping_threshold: Decimal::new(500_000, 0),
        }
    }
}

/// Freeze catalog data into order lines
pub fn build_items(resolved: &[ResolvedLine]) -> Vec<OrderItem> {
    resolved
        .iter()
        .map(|r| OrderItem {
            product_id: r.line.product_id.clone(),
            variant_id: r.line.variant_id.clone(),
            name: r.product.name.clone(),
            variant_name: r.variant.as_ref().map(|v| v.name.clone()),
            quantity: r.line.quantity,
            unit_price: r.unit_price(),
        })
        .collect()
}

/// Discount granted by `voucher` on `subtotal`
pub fn voucher_discount(voucher: &Voucher, subtotal: Decimal) -> OrderResult<Decimal> {
    if !voucher.active {
        return Err(OrderError::VoucherNotApplicable(voucher.code.clone()));
    }
    if voucher.min_subtotal.is_some_and(|min| subtotal < min) {
        return Err(OrderError::VoucherNotApplicable(voucher.code.clone()));
    }
    let raw = match &voucher.discount {
        VoucherDiscount::Percent { percent } => {
            let percent = (*percent).clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
            subtotal * percent / Decimal::ONE_HUNDRED
        }
        VoucherDiscount::Fixed { amount } => (*amount).max(Decimal::ZERO),
    };
    Ok(round_money(raw.min(subtotal)))
}

pub fn compute_amounts(
    items: &[OrderItem],
    voucher: Option<&Voucher>,
    config: &PricingConfig,
) -> OrderResult<OrderAmounts> {
    let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();
    let discount = match voucher {
        Some(v) => voucher_discount(v, subtotal)?,
        None => Decimal::ZERO,
    };
    let shipping = if subtotal >= config.free_shipping_threshold {
        Decimal::ZERO
    } else {
        config.shipping_fee
    };
    let tax = round_money((subtotal - discount) * config.tax_rate_percent / Decimal::ONE_HUNDRED);
    let total = subtotal - discount + shipping + tax;

    Ok(OrderAmounts {
        subtotal,
        discount,
        shipping,
        tax,
        total,
    })
}
