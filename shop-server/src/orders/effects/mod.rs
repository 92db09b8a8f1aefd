//! Status side effects
//!
//! Each effect implements [`StatusEffect`] and runs inside the transition's
//! write transaction, before the new status is recorded. An effect error
//! aborts the whole transition (stock writes included).

use enum_dispatch::enum_dispatch;
use redb::WriteTransaction;
use shared::order::{Order, OrderStatus};

use super::error::OrderError;
use crate::inventory::InventoryService;

mod closing;
mod delivery;
mod restore_inventory;
mod returns;

pub use closing::{MarkRefunded, StampCancelled, StampCompleted};
pub use delivery::{AssignCourier, CountDeliveryRetry, StampDelivered};
pub use restore_inventory::RestoreInventory;
pub use returns::RecordReturn;

/// Everything an effect may touch besides the order itself
pub struct TransitionContext<'a> {
    pub txn: &'a WriteTransaction,
    pub inventory: &'a InventoryService,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub note: &'a str,
    pub now: i64,
}

#[enum_dispatch]
pub trait StatusEffect {
    fn apply(&self, ctx: &TransitionContext<'_>, order: &mut Order) -> Result<(), OrderError>;
}

/// EffectAction enum - dispatches to concrete effect implementations
#[enum_dispatch(StatusEffect)]
#[derive(Debug)]
pub enum EffectAction {
    RestoreInventory(RestoreInventory),
    StampCancelled(StampCancelled),
    MarkRefunded(MarkRefunded),
    AssignCourier(AssignCourier),
    CountDeliveryRetry(CountDeliveryRetry),
    StampDelivered(StampDelivered),
    StampCompleted(StampCompleted),
    RecordReturn(RecordReturn),
}

/// Effects triggered by moving `from -> to`.
///
/// This is the ONLY place that maps target states to side effects.
pub fn effects_for(from: OrderStatus, to: OrderStatus) -> Vec<EffectAction> {
    match to {
        OrderStatus::Cancelled => vec![RestoreInventory.into(), StampCancelled.into()],
        OrderStatus::Refunded => vec![RestoreInventory.into(), MarkRefunded.into()],
        OrderStatus::Shipped if from == OrderStatus::DeliveredFailed => {
            vec![CountDeliveryRetry.into(), AssignCourier.into()]
        }
        OrderStatus::Shipped => vec![AssignCourier.into()],
        OrderStatus::DeliveredSuccess => vec![StampDelivered.into()],
        OrderStatus::Completed => vec![StampCompleted.into()],
        OrderStatus::ReturnRequested => vec![RecordReturn.into()],
        _ => Vec::new(),
    }
}

/// Run every effect for the transition in `ctx`
pub fn apply_all(ctx: &TransitionContext<'_>, order: &mut Order) -> Result<(), OrderError> {
    for effect in effects_for(ctx.from, ctx.to) {
        effect.apply(ctx, order)?;
    }
    Ok(())
}
