use shared::order::{Order, ReturnRequest};

use super::{StatusEffect, TransitionContext};
use crate::orders::error::OrderError;

/// Keep the customer's reason next to the order
#[derive(Debug)]
pub struct RecordReturn;

impl StatusEffect for RecordReturn {
    fn apply(&self, ctx: &TransitionContext<'_>, order: &mut Order) -> Result<(), OrderError> {
        order.return_request = Some(ReturnRequest {
            reason: ctx.note.to_string(),
            requested_at: ctx.now,
        });
        Ok(())
    }
}
