use shared::order::Order;
use shared::payment::PaymentStatus;

use super::{StatusEffect, TransitionContext};
use crate::orders::error::OrderError;

#[derive(Debug)]
pub struct StampCancelled;

impl StatusEffect for StampCancelled {
    fn apply(&self, ctx: &TransitionContext<'_>, order: &mut Order) -> Result<(), OrderError> {
        order.cancelled_at = Some(ctx.now);
        if order.is_paid {
            tracing::warn!(
                order_id = %order.id,
                method = %order.payment_method,
                "Paid order cancelled, refund must be issued manually"
            );
        }
        Ok(())
    }
}

/// Paid orders move to `payment_status = refunded`
#[derive(Debug)]
pub struct MarkRefunded;

impl StatusEffect for MarkRefunded {
    fn apply(&self, _ctx: &TransitionContext<'_>, order: &mut Order) -> Result<(), OrderError> {
        if order.is_paid {
            order.payment_status = PaymentStatus::Refunded;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct StampCompleted;

impl StatusEffect for StampCompleted {
    fn apply(&self, ctx: &TransitionContext<'_>, order: &mut Order) -> Result<(), OrderError> {
        order.completed_at = Some(ctx.now);
        if !order.is_paid {
            tracing::warn!(
                order_id = %order.id,
                method = %order.payment_method,
                "Order completed without recorded payment"
            );
        }
        Ok(())
    }
}
