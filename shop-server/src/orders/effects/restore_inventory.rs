use shared::order::Order;

use super::{StatusEffect, TransitionContext};
use crate::audit_log;
use crate::orders::error::OrderError;

/// Give deducted stock back, at most once per order
#[derive(Debug)]
pub struct RestoreInventory;

impl StatusEffect for RestoreInventory {
    fn apply(&self, ctx: &TransitionContext<'_>, order: &mut Order) -> Result<(), OrderError> {
        if !order.inventory_status.needs_restore() {
            tracing::debug!(order_id = %order.id, "Inventory already restored, skipping");
            return Ok(());
        }
        let lines = order.lines();
        ctx.inventory.restore_in_txn(ctx.txn, &lines)?;
        order.inventory_status.restored = true;
        order.inventory_status.restored_at = Some(ctx.now);

        audit_log!(
            event = "inventory_restored",
            order_id = %order.id,
            to = %ctx.to,
            lines = lines.len()
        );
        Ok(())
    }
}
