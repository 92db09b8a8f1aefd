//! OrdersManager - order lifecycle controller
//!
//! Every mutation follows the same shape:
//!
//! ```text
//! begin_write → load → authorize / state check → effects → record_status
//!             → save (+ indexes) → commit → audit_log → notify
//! ```
//!
//! Stock deduction on create and restoration on cancel/refund run inside
//! the same write transaction as the order document, so an order is never
//! persisted without its deduction and never restored twice.

use redb::WriteTransaction;
use shared::inventory::UnavailableItem;
use shared::order::{
    Actor, CreateOrderRequest, DeliveryOutcome, HistoryKind, NewOrder, Order, OrderStatus, Voucher,
};
use shared::payment::{PaymentInfo, PaymentMethod, PaymentResult, PaymentStatus};
use shared::util::now_millis;
use shared::NotificationKind;
use validator::Validate;

use super::effects::{self, TransitionContext};
use super::error::{OrderError, OrderResult};
use super::pricing::{self, PricingConfig};
use super::state_machine::{self, CustomerAction};
use super::storage;
use crate::audit_log;
use crate::db::Store;
use crate::inventory::{InventoryError, InventoryService};
use crate::notify::NotificationDispatcher;

/// Result of the payment confirmation entry point
#[derive(Debug, Clone)]
pub enum PaymentConfirmation {
    /// First successful callback for this order
    Confirmed(Order),
    /// Already processed; nothing was written
    Duplicate(Order),
}

/// Result of the payment failure entry point
#[derive(Debug, Clone)]
pub enum PaymentFailureOutcome {
    Recorded(Order),
    /// Already `payment_failed`
    AlreadyFailed,
    /// Order is paid or no longer waiting for payment
    Ignored(OrderStatus),
}

/// Who is moving the order and why
struct Change<'a> {
    note: String,
    actor: Actor,
    actor_id: Option<&'a str>,
}

/// 订单生命周期管理器
#[derive(Debug, Clone)]
pub struct OrdersManager {
    store: Store,
    inventory: InventoryService,
    notifier: NotificationDispatcher,
    pricing: PricingConfig,
}

impl OrdersManager {
    pub fn new(
        store: Store,
        inventory: InventoryService,
        notifier: NotificationDispatcher,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            store,
            inventory,
            notifier,
            pricing,
        }
    }

    pub fn notifier(&self) -> &NotificationDispatcher {
        &self.notifier
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Price, check, deduct and persist in one write transaction.
    ///
    /// The owner's own holds do not count against them; holds on the
    /// ordered lines are released once the order exists.
    pub fn create_order(&self, owner_id: &str, request: CreateOrderRequest) -> OrderResult<Order> {
        request
            .validate()
            .map_err(|e| OrderError::Validation(e.to_string()))?;
        if request.items.is_empty() {
            return Err(OrderError::Validation("order has no items".into()));
        }

        let now = now_millis();
        let txn = self.store.begin_write()?;

        let voucher = match &request.voucher_code {
            Some(code) => Some(
                storage::load_voucher(&txn, code)?
                    .ok_or_else(|| OrderError::VoucherNotFound(code.clone()))?,
            ),
            None => None,
        };

        let evaluation = self
            .inventory
            .evaluate_in_txn(&txn, &request.items, Some(owner_id), now)?;
        if !evaluation.unavailable.is_empty() {
            return Err(unavailable(evaluation.unavailable));
        }

        let items = pricing::build_items(&evaluation.resolved);
        let amounts = pricing::compute_amounts(&items, voucher.as_ref(), &self.pricing)?;

        let failures = self.inventory.deduct_in_txn(&txn, &request.items)?;
        if !failures.is_empty() {
            // Dropping the transaction discards the partial deduction
            return Err(unavailable(failures));
        }

        let order_number = storage::next_order_number(&txn, now)?;
        let mut order = Order::new(
            NewOrder {
                id: uuid::Uuid::new_v4().to_string(),
                order_number,
                owner_id: owner_id.to_string(),
                items,
                shipping_address: request.shipping_address,
                amounts,
                voucher_code: voucher.map(|v| v.code),
                payment_method: request.payment_method,
                note: request.note,
            },
            owner_id,
            now,
        );
        order.inventory_status.deducted = true;
        order.inventory_status.deducted_at = Some(now);

        let released = self
            .inventory
            .release_lines_in_txn(&txn, owner_id, &request.items, now)?;
        storage::save(&txn, &order)?;
        txn.commit()?;

        audit_log!(
            event = "order_created",
            order_id = %order.id,
            order_number = %order.order_number,
            owner_id = %owner_id,
            method = %order.payment_method,
            total = %order.amounts.total,
            released_holds = released
        );
        self.notifier
            .notify(&order, NotificationKind::OrderCreated, "Order placed");
        Ok(order)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_order(&self, order_id: &str) -> OrderResult<Order> {
        let txn = self.store.begin_read()?;
        storage::get(&txn, order_id)?.ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    /// Fetch an order the caller owns
    pub fn get_owned_order(&self, order_id: &str, owner_id: &str) -> OrderResult<Order> {
        let order = self.get_order(order_id)?;
        ensure_owner(&order, owner_id)?;
        Ok(order)
    }

    pub fn list_orders_for_owner(&self, owner_id: &str) -> OrderResult<Vec<Order>> {
        let txn = self.store.begin_read()?;
        Ok(storage::list_for_owner(&txn, owner_id)?)
    }

    pub fn list_orders(&self, status: Option<OrderStatus>) -> OrderResult<Vec<Order>> {
        let txn = self.store.begin_read()?;
        Ok(storage::list_all(&txn, status)?)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Load, authorize, apply effects, record and persist one transition
    fn transition<F>(
        &self,
        order_id: &str,
        to: OrderStatus,
        change: Change<'_>,
        authorize: F,
    ) -> OrderResult<Order>
    where
        F: FnOnce(&Order) -> OrderResult<()>,
    {
        let now = now_millis();
        let txn = self.store.begin_write()?;
        let mut order = load_in(&txn, order_id)?;
        authorize(&order)?;

        let from = order.status;
        let ctx = TransitionContext {
            txn: &txn,
            inventory: &self.inventory,
            from,
            to,
            note: &change.note,
            now,
        };
        effects::apply_all(&ctx, &mut order)?;
        order.record_status(to, change.note.as_str(), change.actor, change.actor_id, now);
        storage::save(&txn, &order)?;
        txn.commit()?;

        audit_log!(
            event = "order_status_changed",
            order_id = %order.id,
            from = %from,
            to = %to,
            actor = ?change.actor,
            actor_id = ?change.actor_id
        );
        self.notifier.notify(
            &order,
            NotificationKind::for_status(to),
            format!("Order {} is now {}", order.order_number, to),
        );
        Ok(order)
    }

    /// `PATCH /orders/{id}/status` - admin edges only
    pub fn update_status(
        &self,
        order_id: &str,
        to: OrderStatus,
        note: Option<String>,
        admin_id: &str,
    ) -> OrderResult<Order> {
        let change = Change {
            note: note.unwrap_or_else(|| format!("Status changed to {to} by admin")),
            actor: Actor::Admin,
            actor_id: Some(admin_id),
        };
        self.transition(order_id, to, change, |order| {
            state_machine::check_admin(order.status, to)
        })
    }

    /// Customer-initiated transition on an order the caller owns
    pub fn customer_action(
        &self,
        order_id: &str,
        owner_id: &str,
        action: CustomerAction,
        note: Option<String>,
    ) -> OrderResult<Order> {
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if action == CustomerAction::RequestReturn && note.is_none() {
            return Err(OrderError::Validation("a return reason is required".into()));
        }
        let change = Change {
            note: note.unwrap_or_else(|| action.default_note().to_string()),
            actor: Actor::Customer,
            actor_id: Some(owner_id),
        };
        self.transition(order_id, action.target(), change, |order| {
            ensure_owner(order, owner_id)?;
            action.check(order.status)?;
            if action == CustomerAction::RequestRefund {
                if !order.is_paid {
                    return Err(OrderError::RefundNotAllowed(
                        "order has not been paid".to_string(),
                    ));
                }
                if order.times_entered(OrderStatus::RefundRequested) > 0 {
                    return Err(OrderError::RefundAlreadyRequested(order.id.clone()));
                }
            }
            Ok(())
        })
    }

    /// Courier (or admin on the courier's behalf) reports what happened at the door
    pub fn record_delivery_outcome(
        &self,
        order_id: &str,
        outcome: DeliveryOutcome,
        actor: Actor,
        actor_id: &str,
        note: Option<String>,
    ) -> OrderResult<Order> {
        let to = outcome.status();
        let change = Change {
            note: note.unwrap_or_else(|| format!("Delivery outcome: {to}")),
            actor,
            actor_id: Some(actor_id),
        };
        self.transition(order_id, to, change, |order| {
            state_machine::check_courier(order.status, to)
        })
    }

    // ========================================================================
    // Payment entry points
    // ========================================================================

    /// Idempotent success path for every provider.
    ///
    /// Guards, in order: `(provider, transaction)` already processed, order
    /// already paid, amount mismatch. A `draft` order moves to `pending`;
    /// any other status only records the payment.
    pub fn confirm_order_after_payment(
        &self,
        order_id: &str,
        info: &PaymentInfo,
    ) -> OrderResult<PaymentConfirmation> {
        let now = now_millis();
        let callback_key = storage::callback_key(info.method.as_str(), &info.transaction_id);
        let txn = self.store.begin_write()?;
        let mut order = load_in(&txn, order_id)?;

        if storage::is_callback_processed(&txn, &callback_key)? {
            tracing::info!(order_id = %order_id, provider = %info.method, transaction_id = %info.transaction_id, "Duplicate payment callback");
            return Ok(PaymentConfirmation::Duplicate(order));
        }
        if order.is_paid && order.payment_status == PaymentStatus::Paid {
            if order
                .payment_result
                .as_ref()
                .is_some_and(|r| r.transaction_id != info.transaction_id)
            {
                tracing::warn!(
                    order_id = %order_id,
                    provider = %info.method,
                    transaction_id = %info.transaction_id,
                    "Second payment for an already paid order, refund manually"
                );
                storage::mark_callback_processed(&txn, &callback_key, order_id)?;
                txn.commit()?;
            }
            return Ok(PaymentConfirmation::Duplicate(order));
        }
        if info.amount != order.amounts.total {
            return Err(OrderError::AmountMismatch {
                expected: order.amounts.total,
                received: info.amount,
            });
        }

        order.is_paid = true;
        order.paid_at = Some(now);
        order.payment_status = PaymentStatus::Paid;
        order.payment_failure_reason = None;
        order.payment_result = Some(PaymentResult {
            method: info.method,
            transaction_id: info.transaction_id.clone(),
            amount: info.amount,
            provider_code: info.provider_code.clone(),
            paid_at: now,
        });

        let from = order.status;
        let audit_note = format!("Paid via {} (transaction {})", info.method, info.transaction_id);
        if from == OrderStatus::Draft {
            order.record_status(
                OrderStatus::Pending,
                "Payment received, awaiting confirmation",
                Actor::Payment,
                None,
                now,
            );
        } else {
            tracing::warn!(
                order_id = %order_id,
                status = %from,
                provider = %info.method,
                "Payment arrived for an order no longer awaiting payment, refund manually if needed"
            );
        }
        order.record_payment_event(HistoryKind::PaymentSuccess, audit_note, now);

        storage::mark_callback_processed(&txn, &callback_key, order_id)?;
        storage::save(&txn, &order)?;
        txn.commit()?;

        audit_log!(
            event = "payment_confirmed",
            order_id = %order.id,
            provider = %info.method,
            transaction_id = %info.transaction_id,
            amount = %info.amount,
            from = %from,
            to = %order.status
        );
        self.notifier.notify(
            &order,
            NotificationKind::PaymentConfirmed,
            format!("Payment received for order {}", order.order_number),
        );
        Ok(PaymentConfirmation::Confirmed(order))
    }

    /// Failure path. Stock stays deducted until the order is cancelled.
    pub fn handle_payment_failed(
        &self,
        order_id: &str,
        method: PaymentMethod,
        reason: &str,
    ) -> OrderResult<PaymentFailureOutcome> {
        let now = now_millis();
        let txn = self.store.begin_write()?;
        let mut order = load_in(&txn, order_id)?;

        if order.status == OrderStatus::PaymentFailed {
            return Ok(PaymentFailureOutcome::AlreadyFailed);
        }
        if order.is_paid || order.status != OrderStatus::Draft {
            tracing::info!(order_id = %order_id, status = %order.status, provider = %method, "Payment failure ignored");
            return Ok(PaymentFailureOutcome::Ignored(order.status));
        }

        order.is_paid = false;
        order.payment_status = PaymentStatus::Failed;
        order.payment_failure_reason = Some(reason.to_string());
        order.record_status(OrderStatus::PaymentFailed, reason, Actor::Payment, None, now);
        order.record_payment_event(HistoryKind::PaymentFailed, format!("{method}: {reason}"), now);
        storage::save(&txn, &order)?;
        txn.commit()?;

        audit_log!(
            event = "payment_failed",
            order_id = %order.id,
            provider = %method,
            reason = %reason
        );
        self.notifier.notify(
            &order,
            NotificationKind::PaymentFailed,
            format!("Payment for order {} failed", order.order_number),
        );
        Ok(PaymentFailureOutcome::Recorded(order))
    }

    /// Check that the caller may (re)start an online payment for the order
    /// and open a fresh payment window.
    ///
    /// The draft sweeper measures its TTL from this stamp, so a charge
    /// created just before expiry is not cancelled under the customer.
    pub fn order_for_payment(&self, order_id: &str, owner_id: &str) -> OrderResult<Order> {
        let txn = self.store.begin_write()?;
        let mut order = load_in(&txn, order_id)?;
        ensure_owner(&order, owner_id)?;
        if !order.payment_method.is_online() {
            return Err(OrderError::PaymentNotRequired(order.id));
        }
        if order.is_paid {
            return Err(OrderError::AlreadyPaid(order.id));
        }
        if order.status != OrderStatus::Draft {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Pending,
            });
        }

        let now = now_millis();
        order.last_charge_at = Some(now);
        order.updated_at = now;
        storage::save(&txn, &order)?;
        txn.commit()?;
        tracing::debug!(order_id = %order.id, "Payment window restarted");
        Ok(order)
    }

    // ========================================================================
    // Draft expiry
    // ========================================================================

    /// Cancel orders still awaiting payment after `ttl_ms`; returns the count
    pub fn expire_stale_drafts(&self, ttl_ms: i64) -> OrderResult<usize> {
        let cutoff = now_millis() - ttl_ms;
        let candidates = {
            let txn = self.store.begin_read()?;
            storage::awaiting_payment_before(&txn, cutoff)?
        };

        let mut expired = 0;
        for order_id in candidates {
            let change = Change {
                note: "Payment window expired".to_string(),
                actor: Actor::System,
                actor_id: None,
            };
            // Re-checked inside the transaction: a callback or a new charge
            // attempt may have landed meanwhile
            let result = self.transition(&order_id, OrderStatus::Cancelled, change, |order| {
                if order.awaits_payment() && order.payment_window_start() <= cutoff {
                    Ok(())
                } else {
                    Err(OrderError::InvalidTransition {
                        from: order.status,
                        to: OrderStatus::Cancelled,
                    })
                }
            });
            match result {
                Ok(_) => expired += 1,
                Err(OrderError::InvalidTransition { from, .. }) => {
                    tracing::debug!(order_id = %order_id, status = %from, "Order no longer due for expiry");
                }
                Err(e) => tracing::error!(order_id = %order_id, error = %e, "Failed to expire draft order"),
            }
        }
        Ok(expired)
    }

    // ========================================================================
    // Vouchers
    // ========================================================================

    pub fn upsert_voucher(&self, voucher: Voucher) -> OrderResult<Voucher> {
        voucher
            .validate()
            .map_err(|e| OrderError::Validation(e.to_string()))?;
        let txn = self.store.begin_write()?;
        storage::save_voucher(&txn, &voucher)?;
        txn.commit()?;
        audit_log!(event = "voucher_upserted", code = %voucher.code, active = voucher.active);
        Ok(voucher)
    }

    pub fn list_vouchers(&self) -> OrderResult<Vec<Voucher>> {
        let txn = self.store.begin_read()?;
        Ok(storage::list_vouchers(&txn)?)
    }
}

fn load_in(txn: &WriteTransaction, order_id: &str) -> OrderResult<Order> {
    storage::load(txn, order_id)?.ok_or_else(|| OrderError::NotFound(order_id.to_string()))
}

fn ensure_owner(order: &Order, owner_id: &str) -> OrderResult<()> {
    if order.is_owned_by(owner_id) {
        Ok(())
    } else {
        Err(OrderError::NotOwned(order.id.clone()))
    }
}

fn unavailable(items: Vec<UnavailableItem>) -> OrderError {
    OrderError::Inventory(InventoryError::Unavailable(items))
}

#[cfg(test)]
mod tests;
