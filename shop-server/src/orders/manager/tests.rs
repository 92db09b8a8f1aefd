use super::*;
use rust_decimal::Decimal;
use shared::inventory::{CartItemRequest, LineRequest, Product, StockKey};
use shared::order::ShippingAddress;
use shared::OrderNotification;
use tokio::sync::broadcast;

// ========================================================================
// Helpers
// ========================================================================

struct Fixture {
    manager: OrdersManager,
    inventory: InventoryService,
}

fn setup(on_hand: u64) -> Fixture {
    let store = Store::open_in_memory().unwrap();
    let inventory = InventoryService::new(store.clone(), 15);
    inventory
        .upsert_product(Product {
            id: "p".into(),
            name: "Product P".into(),
            price: Decimal::new(100_000, 0),
            variants: vec![],
            active: true,
        })
        .unwrap();
    inventory.set_on_hand("p", None, on_hand).unwrap();
    let manager = OrdersManager::new(
        store,
        inventory.clone(),
        NotificationDispatcher::new(),
        PricingConfig::default(),
    );
    Fixture { manager, inventory }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Le Van C".into(),
        phone: "0987654321".into(),
        address_line: "5 Nguyen Hue".into(),
        ward: Some("Ben Nghe".into()),
        district: "Quan 1".into(),
        province: "Ho Chi Minh".into(),
    }
}

fn request(quantity: u32, method: PaymentMethod) -> CreateOrderRequest {
    CreateOrderRequest {
        items: vec![LineRequest::new("p", None, quantity)],
        shipping_address: address(),
        payment_method: method,
        voucher_code: None,
        note: None,
    }
}

fn on_hand(fx: &Fixture) -> u64 {
    fx.inventory.get_available_stock("p", None).unwrap().on_hand
}

fn momo_payment(order: &Order, transaction_id: &str) -> PaymentInfo {
    PaymentInfo {
        method: PaymentMethod::Momo,
        transaction_id: transaction_id.to_string(),
        amount: order.amounts.total,
        provider_code: "0".to_string(),
    }
}

/// Walk a COD order to `shipped` through the admin edges
fn ship(fx: &Fixture, order_id: &str) {
    for to in [OrderStatus::Confirmed, OrderStatus::Processing, OrderStatus::Shipped] {
        fx.manager.update_status(order_id, to, None, "admin-1").unwrap();
    }
}

fn drain(rx: &mut broadcast::Receiver<OrderNotification>) -> Vec<OrderNotification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

// ========================================================================
// Creation
// ========================================================================

#[test]
fn test_create_cod_order_deducts_and_prices() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(2, PaymentMethod::Cod)).unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.inventory_status.deducted);
    assert!(!order.inventory_status.restored);
    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.items[0].unit_price, Decimal::new(100_000, 0));
    assert_eq!(order.amounts.subtotal, Decimal::new(200_000, 0));
    assert_eq!(order.amounts.total, Decimal::new(230_000, 0));
    assert_eq!(on_hand(&fx), 3);
    assert!(!fx.manager.list_orders_for_owner("u1").unwrap().is_empty());
}

#[test]
fn test_online_order_starts_in_draft() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Momo)).unwrap();
    assert_eq!(order.status, OrderStatus::Draft);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[test]
fn test_insufficient_stock_creates_nothing() {
    let fx = setup(2);
    let err = fx.manager.create_order("u1", request(3, PaymentMethod::Cod)).unwrap_err();
    match err {
        OrderError::Inventory(InventoryError::Unavailable(items)) => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].available, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(on_hand(&fx), 2);
    assert!(fx.manager.list_orders(None).unwrap().is_empty());
}

#[test]
fn test_unknown_voucher_is_rejected() {
    let fx = setup(5);
    let mut req = request(1, PaymentMethod::Cod);
    req.voucher_code = Some("NOPE".into());
    assert!(matches!(
        fx.manager.create_order("u1", req),
        Err(OrderError::VoucherNotFound(_))
    ));
    assert_eq!(on_hand(&fx), 5);
}

#[test]
fn test_competing_reservations_only_one_checks_out() {
    let fx = setup(5);
    let hold = CartItemRequest {
        product_id: "p".into(),
        variant_id: None,
        quantity: 3,
    };
    fx.inventory.create_reservation("a", &hold).unwrap();
    assert!(fx.inventory.create_reservation("b", &hold).is_err());
    assert!(fx.inventory.get_available_stock("p", Some("b")).unwrap().available <= 2);

    // B cannot check out 3 while A holds 3
    assert!(fx.manager.create_order("b", request(3, PaymentMethod::Cod)).is_err());
    // A's own hold does not block A
    let order = fx.manager.create_order("a", request(3, PaymentMethod::Cod)).unwrap();
    assert!(order.inventory_status.deducted);
    assert_eq!(on_hand(&fx), 2);
    // The converted hold was released
    assert_eq!(fx.inventory.get_reserved_quantity(&StockKey::product("p")).unwrap(), 0);
    assert!(fx.inventory.list_reservations("a").unwrap().is_empty());
}

#[test]
fn test_concurrent_checkouts_never_oversell() {
    let fx = setup(10);
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let manager = fx.manager.clone();
            std::thread::spawn(move || {
                manager
                    .create_order(&format!("u{i}"), request(3, PaymentMethod::Cod))
                    .map(|o| o.items[0].quantity)
                    .unwrap_or(0)
            })
        })
        .collect();
    let sold: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(sold, 9);
    assert_eq!(on_hand(&fx), 1);
    assert_eq!(fx.manager.list_orders(None).unwrap().len(), 3);
}

// ========================================================================
// Cancellation and restoration
// ========================================================================

#[test]
fn test_admin_cancel_restores_exactly_once() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(2, PaymentMethod::Cod)).unwrap();
    assert_eq!(on_hand(&fx), 3);

    let cancelled = fx
        .manager
        .update_status(&order.id, OrderStatus::Cancelled, None, "admin-1")
        .unwrap();
    assert!(cancelled.inventory_status.restored);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(on_hand(&fx), 5);

    // Duplicate click
    let err = fx
        .manager
        .update_status(&order.id, OrderStatus::Cancelled, None, "admin-1")
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
    assert_eq!(on_hand(&fx), 5);
}

#[test]
fn test_customer_cancel_requires_ownership() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Cod)).unwrap();
    assert!(matches!(
        fx.manager
            .customer_action(&order.id, "u2", CustomerAction::Cancel, None),
        Err(OrderError::NotOwned(_))
    ));
    let cancelled = fx
        .manager
        .customer_action(&order.id, "u1", CustomerAction::Cancel, Some("changed my mind".into()))
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.status_history().last().unwrap().note, "changed my mind");
    assert_eq!(on_hand(&fx), 5);
}

// ========================================================================
// Admin transitions
// ========================================================================

#[test]
fn test_admin_cannot_move_shipped_order() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Cod)).unwrap();
    ship(&fx, &order.id);

    let err = fx
        .manager
        .update_status(&order.id, OrderStatus::Processing, None, "admin-1")
        .unwrap_err();
    assert!(matches!(err, OrderError::NotAdminControllable(OrderStatus::Shipped)));
    let current = fx.manager.get_order(&order.id).unwrap();
    assert_eq!(current.status, OrderStatus::Shipped);
    assert!(current.delivery_person.as_ref().is_some_and(|d| d.placeholder));
}

#[test]
fn test_illegal_transition_leaves_history_untouched() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Cod)).unwrap();
    let before = order.status_history().len();
    assert!(fx
        .manager
        .update_status(&order.id, OrderStatus::Completed, None, "admin-1")
        .is_err());
    let after = fx.manager.get_order(&order.id).unwrap();
    assert_eq!(after.status, OrderStatus::Pending);
    assert_eq!(after.status_history().len(), before);
}

#[test]
fn test_delivery_retry_is_capped() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Cod)).unwrap();
    ship(&fx, &order.id);

    for attempt in 1..=3 {
        fx.manager
            .record_delivery_outcome(&order.id, DeliveryOutcome::DeliveredFailed, Actor::Courier, "c1", None)
            .unwrap();
        let retried = fx
            .manager
            .update_status(&order.id, OrderStatus::Shipped, None, "admin-1")
            .unwrap();
        assert_eq!(retried.retry_delivery_count, attempt);
    }

    fx.manager
        .record_delivery_outcome(&order.id, DeliveryOutcome::DeliveredFailed, Actor::Courier, "c1", None)
        .unwrap();
    let err = fx
        .manager
        .update_status(&order.id, OrderStatus::Shipped, None, "admin-1")
        .unwrap_err();
    assert!(matches!(err, OrderError::DeliveryRetryExhausted(3)));
    assert_eq!(
        fx.manager.get_order(&order.id).unwrap().status,
        OrderStatus::DeliveredFailed
    );
}

// ========================================================================
// Customer flows after delivery
// ========================================================================

#[test]
fn test_cod_delivery_marks_paid_and_completes() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Cod)).unwrap();
    ship(&fx, &order.id);

    let delivered = fx
        .manager
        .customer_action(&order.id, "u1", CustomerAction::ConfirmDelivery, None)
        .unwrap();
    assert!(delivered.is_paid);
    assert_eq!(delivered.payment_status, PaymentStatus::Paid);
    assert!(delivered.delivered_at.is_some());

    let completed = fx
        .manager
        .customer_action(&order.id, "u1", CustomerAction::ConfirmSatisfaction, None)
        .unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
    assert!(completed.completed_at.is_some());
}

#[test]
fn test_refund_can_be_requested_once() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Cod)).unwrap();
    ship(&fx, &order.id);
    fx.manager
        .record_delivery_outcome(&order.id, DeliveryOutcome::DeliveredSuccess, Actor::Courier, "c1", None)
        .unwrap();

    fx.manager
        .customer_action(&order.id, "u1", CustomerAction::RequestRefund, None)
        .unwrap();
    // Admin rejects the refund
    fx.manager
        .update_status(&order.id, OrderStatus::DeliveredSuccess, Some("rejected".into()), "admin-1")
        .unwrap();

    let err = fx
        .manager
        .customer_action(&order.id, "u1", CustomerAction::RequestRefund, None)
        .unwrap_err();
    assert!(matches!(err, OrderError::RefundAlreadyRequested(_)));
    let order = fx.manager.get_order(&order.id).unwrap();
    assert_eq!(order.times_entered(OrderStatus::RefundRequested), 1);
}

#[test]
fn test_refund_requires_payment() {
    let fx = setup(5);

    // Unpaid online order pushed through by an admin
    let unpaid = fx.manager.create_order("u1", request(1, PaymentMethod::Momo)).unwrap();
    fx.manager
        .update_status(&unpaid.id, OrderStatus::Pending, None, "admin-1")
        .unwrap();
    ship(&fx, &unpaid.id);
    fx.manager
        .customer_action(&unpaid.id, "u1", CustomerAction::ConfirmDelivery, None)
        .unwrap();
    assert!(matches!(
        fx.manager
            .customer_action(&unpaid.id, "u1", CustomerAction::RequestRefund, None),
        Err(OrderError::RefundNotAllowed(_))
    ));

    let paid = fx.manager.create_order("u1", request(1, PaymentMethod::Momo)).unwrap();
    fx.manager
        .confirm_order_after_payment(&paid.id, &momo_payment(&paid, "t1"))
        .unwrap();
    ship(&fx, &paid.id);
    fx.manager
        .customer_action(&paid.id, "u1", CustomerAction::ConfirmDelivery, None)
        .unwrap();
    let requested = fx
        .manager
        .customer_action(&paid.id, "u1", CustomerAction::RequestRefund, None)
        .unwrap();
    assert_eq!(requested.status, OrderStatus::RefundRequested);
    assert_eq!(on_hand(&fx), 3);

    let refunded = fx
        .manager
        .update_status(&paid.id, OrderStatus::Refunded, None, "admin-1")
        .unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    assert!(refunded.inventory_status.restored);
    assert_eq!(on_hand(&fx), 4);
}

#[test]
fn test_return_requires_reason() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Cod)).unwrap();
    ship(&fx, &order.id);
    assert!(matches!(
        fx.manager
            .customer_action(&order.id, "u1", CustomerAction::RequestReturn, Some("  ".into())),
        Err(OrderError::Validation(_))
    ));
    let returned = fx
        .manager
        .customer_action(&order.id, "u1", CustomerAction::RequestReturn, Some("wrong size".into()))
        .unwrap();
    assert_eq!(returned.return_request.unwrap().reason, "wrong size");
}

// ========================================================================
// Payment entry points
// ========================================================================

#[test]
fn test_replayed_success_callback_confirms_once() {
    let fx = setup(5);
    let mut rx = fx.manager.notifier().subscribe();
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Momo)).unwrap();
    let info = momo_payment(&order, "2588000001");

    let first = fx.manager.confirm_order_after_payment(&order.id, &info).unwrap();
    let second = fx.manager.confirm_order_after_payment(&order.id, &info).unwrap();
    assert!(matches!(first, PaymentConfirmation::Confirmed(_)));
    assert!(matches!(second, PaymentConfirmation::Duplicate(_)));

    let order = fx.manager.get_order(&order.id).unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.is_paid);
    assert_eq!(order.count_history(HistoryKind::PaymentSuccess), 1);
    assert_eq!(order.payment_result.unwrap().transaction_id, "2588000001");

    let confirmed = drain(&mut rx)
        .into_iter()
        .filter(|n| n.kind == NotificationKind::PaymentConfirmed)
        .count();
    assert_eq!(confirmed, 1);
}

#[test]
fn test_amount_mismatch_leaves_order_untouched() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Momo)).unwrap();
    let mut info = momo_payment(&order, "t1");
    info.amount = Decimal::new(1_000, 0);

    assert!(matches!(
        fx.manager.confirm_order_after_payment(&order.id, &info),
        Err(OrderError::AmountMismatch { .. })
    ));
    let order = fx.manager.get_order(&order.id).unwrap();
    assert_eq!(order.status, OrderStatus::Draft);
    assert!(!order.is_paid);
}

#[test]
fn test_late_payment_does_not_reopen_cancelled_order() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Momo)).unwrap();
    fx.manager
        .customer_action(&order.id, "u1", CustomerAction::Cancel, None)
        .unwrap();

    let result = fx
        .manager
        .confirm_order_after_payment(&order.id, &momo_payment(&order, "late"))
        .unwrap();
    let PaymentConfirmation::Confirmed(order) = result else {
        panic!("late payment must still be recorded");
    };
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(order.is_paid);
    assert_eq!(order.count_history(HistoryKind::PaymentSuccess), 1);
}

#[test]
fn test_payment_failure_keeps_stock_until_cancel() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(2, PaymentMethod::Momo)).unwrap();

    let outcome = fx
        .manager
        .handle_payment_failed(&order.id, PaymentMethod::Momo, "user declined")
        .unwrap();
    let PaymentFailureOutcome::Recorded(failed) = outcome else {
        panic!("expected failure to be recorded");
    };
    assert_eq!(failed.status, OrderStatus::PaymentFailed);
    assert_eq!(failed.payment_status, PaymentStatus::Failed);
    assert_eq!(failed.payment_failure_reason.as_deref(), Some("user declined"));
    assert_eq!(failed.count_history(HistoryKind::PaymentFailed), 1);
    assert_eq!(on_hand(&fx), 3);

    assert!(matches!(
        fx.manager
            .handle_payment_failed(&order.id, PaymentMethod::Momo, "again")
            .unwrap(),
        PaymentFailureOutcome::AlreadyFailed
    ));

    fx.manager
        .customer_action(&order.id, "u1", CustomerAction::Cancel, None)
        .unwrap();
    assert_eq!(on_hand(&fx), 5);
}

#[test]
fn test_success_after_failure_records_payment_and_leaves_sweep_index() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Momo)).unwrap();
    fx.manager
        .handle_payment_failed(&order.id, PaymentMethod::Momo, "timeout at wallet")
        .unwrap();

    let confirmed = fx
        .manager
        .confirm_order_after_payment(&order.id, &momo_payment(&order, "t9"))
        .unwrap();
    let PaymentConfirmation::Confirmed(paid) = confirmed else {
        panic!("expected the payment to be recorded");
    };
    assert_eq!(paid.status, OrderStatus::PaymentFailed);
    assert!(paid.is_paid);
    assert_eq!(paid.count_history(HistoryKind::PaymentSuccess), 1);

    let read = fx.manager.store.begin_read().unwrap();
    assert!(crate::orders::storage::awaiting_payment_before(&read, i64::MAX).unwrap().is_empty());
    drop(read);

    // Paid orders are never expired, stock stays with the order
    assert_eq!(fx.manager.expire_stale_drafts(0).unwrap(), 0);
    assert_eq!(on_hand(&fx), 4);
}

#[test]
fn test_failure_after_success_is_ignored() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(1, PaymentMethod::Momo)).unwrap();
    fx.manager
        .confirm_order_after_payment(&order.id, &momo_payment(&order, "t1"))
        .unwrap();
    assert!(matches!(
        fx.manager
            .handle_payment_failed(&order.id, PaymentMethod::Momo, "late failure")
            .unwrap(),
        PaymentFailureOutcome::Ignored(OrderStatus::Pending)
    ));
}

#[test]
fn test_order_for_payment_checks() {
    let fx = setup(5);
    let cod = fx.manager.create_order("u1", request(1, PaymentMethod::Cod)).unwrap();
    assert!(matches!(
        fx.manager.order_for_payment(&cod.id, "u1"),
        Err(OrderError::PaymentNotRequired(_))
    ));
    let momo = fx.manager.create_order("u1", request(1, PaymentMethod::Momo)).unwrap();
    assert!(fx.manager.order_for_payment(&momo.id, "u1").is_ok());
    assert!(matches!(
        fx.manager.order_for_payment(&momo.id, "u2"),
        Err(OrderError::NotOwned(_))
    ));
}

// ========================================================================
// Draft expiry
// ========================================================================

#[test]
fn test_stale_drafts_are_cancelled_and_restocked() {
    let fx = setup(5);
    let draft = fx.manager.create_order("u1", request(2, PaymentMethod::VnPay)).unwrap();
    let paid = fx.manager.create_order("u1", request(1, PaymentMethod::Momo)).unwrap();
    fx.manager
        .confirm_order_after_payment(&paid.id, &momo_payment(&paid, "t1"))
        .unwrap();
    let cod = fx.manager.create_order("u1", request(1, PaymentMethod::Cod)).unwrap();
    assert_eq!(on_hand(&fx), 1);

    assert_eq!(fx.manager.expire_stale_drafts(0).unwrap(), 1);
    assert_eq!(
        fx.manager.get_order(&draft.id).unwrap().status,
        OrderStatus::Cancelled
    );
    assert_eq!(fx.manager.get_order(&paid.id).unwrap().status, OrderStatus::Pending);
    assert_eq!(fx.manager.get_order(&cod.id).unwrap().status, OrderStatus::Pending);
    assert_eq!(on_hand(&fx), 3);

    // Nothing left to expire
    assert_eq!(fx.manager.expire_stale_drafts(0).unwrap(), 0);
}

#[test]
fn test_recreated_charge_restarts_payment_window() {
    let fx = setup(5);
    let order = fx.manager.create_order("u1", request(2, PaymentMethod::VnPay)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(300));

    // Charge re-created after the TTL from placement has already passed
    let restarted = fx.manager.order_for_payment(&order.id, "u1").unwrap();
    assert!(restarted.payment_window_start() > order.created_at);
    assert_eq!(fx.manager.expire_stale_drafts(200).unwrap(), 0);
    assert_eq!(fx.manager.get_order(&order.id).unwrap().status, OrderStatus::Draft);
    assert_eq!(on_hand(&fx), 3);

    std::thread::sleep(std::time::Duration::from_millis(250));
    assert_eq!(fx.manager.expire_stale_drafts(200).unwrap(), 1);
    assert_eq!(fx.manager.get_order(&order.id).unwrap().status, OrderStatus::Cancelled);
    assert_eq!(on_hand(&fx), 5);
}

#[test]
fn test_fresh_drafts_survive() {
    let fx = setup(5);
    fx.manager.create_order("u1", request(1, PaymentMethod::Card)).unwrap();
    assert_eq!(fx.manager.expire_stale_drafts(60 * 60 * 1000).unwrap(), 0);
}
