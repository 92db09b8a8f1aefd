use shared::order::{DeliveryPerson, Order, OrderStatus};
use shared::payment::{PaymentMethod, PaymentStatus};

use super::{StatusEffect, TransitionContext};
use crate::orders::error::OrderError;
use crate::orders::state_machine::MAX_DELIVERY_RETRIES;

/// 发货时没有配送员则挂一个占位
#[derive(Debug)]
pub struct AssignCourier;

impl StatusEffect for AssignCourier {
    fn apply(&self, _ctx: &TransitionContext<'_>, order: &mut Order) -> Result<(), OrderError> {
        if order.delivery_person.is_none() {
            tracing::info!(order_id = %order.id, "No courier assigned, using placeholder");
            order.delivery_person = Some(DeliveryPerson::placeholder());
        }
        Ok(())
    }
}

/// `delivered_failed -> shipped` retry budget
#[derive(Debug)]
pub struct CountDeliveryRetry;

impl StatusEffect for CountDeliveryRetry {
    fn apply(&self, ctx: &TransitionContext<'_>, order: &mut Order) -> Result<(), OrderError> {
        if ctx.from != OrderStatus::DeliveredFailed {
            return Ok(());
        }
        if order.retry_delivery_count >= MAX_DELIVERY_RETRIES {
            return Err(OrderError::DeliveryRetryExhausted(order.retry_delivery_count));
        }
        order.retry_delivery_count += 1;
        Ok(())
    }
}

/// Delivered: stamp the first delivery time; cash on delivery counts as
/// collected. A rejected return or refund lands here again and keeps the
/// original stamp.
#[derive(Debug)]
pub struct StampDelivered;

impl StatusEffect for StampDelivered {
    fn apply(&self, ctx: &TransitionContext<'_>, order: &mut Order) -> Result<(), OrderError> {
        if order.delivered_at.is_none() {
            order.delivered_at = Some(ctx.now);
        }
        if order.payment_method == PaymentMethod::Cod && !order.is_paid {
            order.is_paid = true;
            order.paid_at = Some(ctx.now);
            order.payment_status = PaymentStatus::Paid;
        }
        Ok(())
    }
}
