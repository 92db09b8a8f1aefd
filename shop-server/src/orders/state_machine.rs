//! 订单状态机
//!
//! Three independent edge sets over [`OrderStatus`]:
//!
//! - admin edges ([`admin_targets`]): the warehouse-side workflow
//! - customer actions ([`CustomerAction`]): cancel, confirm delivery, returns, refunds
//! - courier outcomes ([`courier_targets`]): what happened at the door
//!
//! Once a parcel has left the warehouse (`shipped`, `delivered_success`)
//! admins have no outbound edges at all; only the customer or courier can
//! move the order on.

use shared::order::OrderStatus;

use super::error::{OrderError, OrderResult};

/// Maximum `delivered_failed -> shipped` retries per order
pub const MAX_DELIVERY_RETRIES: u32 = 3;

/// Admin-reachable targets from `from`
pub fn admin_targets(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Draft => &[Pending, Cancelled],
        Pending => &[Confirmed, Cancelled, OnHold],
        Confirmed => &[Processing, Cancelled, OnHold],
        Processing => &[Shipped, Cancelled, OnHold],
        DeliveredFailed => &[Shipped, Cancelled],
        OnHold => &[Processing, Cancelled],
        ReturnRequested => &[Returned, DeliveredSuccess],
        Returned => &[RefundRequested, Refunded],
        RefundRequested => &[Refunded, DeliveredSuccess],
        PaymentFailed => &[Cancelled],
        PartiallyDelivered => &[ReturnPending, Completed],
        ReturnPending => &[ReturnConfirmed],
        ReturnConfirmed => &[ReturnProcessing],
        ReturnProcessing => &[ReturnCompleted],
        ReturnCompleted => &[Refunded],
        Shipped | DeliveredSuccess | Completed | Cancelled | Refunded => &[],
    }
}

/// Statuses whose onward movement belongs to the customer / courier
pub fn is_admin_controllable(status: OrderStatus) -> bool {
    !matches!(status, OrderStatus::Shipped | OrderStatus::DeliveredSuccess)
}

/// Validate an admin-initiated transition
pub fn check_admin(from: OrderStatus, to: OrderStatus) -> OrderResult<()> {
    if !is_admin_controllable(from) {
        return Err(OrderError::NotAdminControllable(from));
    }
    if admin_targets(from).contains(&to) {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}

/// Courier-reported outcomes, only while the parcel is out
pub fn courier_targets(from: OrderStatus) -> &'static [OrderStatus] {
    match from {
        OrderStatus::Shipped => &[
            OrderStatus::DeliveredSuccess,
            OrderStatus::DeliveredFailed,
            OrderStatus::PartiallyDelivered,
        ],
        _ => &[],
    }
}

pub fn check_courier(from: OrderStatus, to: OrderStatus) -> OrderResult<()> {
    if courier_targets(from).contains(&to) {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}

/// Customer-initiated actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerAction {
    Cancel,
    ConfirmDelivery,
    RequestReturn,
    ConfirmSatisfaction,
    RequestRefund,
    ReportDeliveryFailure,
}

impl CustomerAction {
    pub fn target(self) -> OrderStatus {
        match self {
            CustomerAction::Cancel => OrderStatus::Cancelled,
            CustomerAction::ConfirmDelivery => OrderStatus::DeliveredSuccess,
            CustomerAction::RequestReturn => OrderStatus::ReturnRequested,
            CustomerAction::ConfirmSatisfaction => OrderStatus::Completed,
            CustomerAction::RequestRefund => OrderStatus::RefundRequested,
            CustomerAction::ReportDeliveryFailure => OrderStatus::DeliveredFailed,
        }
    }

    pub fn allowed_from(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            CustomerAction::Cancel => &[Draft, Pending, Confirmed, PaymentFailed],
            CustomerAction::ConfirmDelivery => &[Shipped],
            CustomerAction::RequestReturn => &[Shipped, DeliveredSuccess],
            CustomerAction::ConfirmSatisfaction => &[DeliveredSuccess],
            CustomerAction::RequestRefund => &[DeliveredSuccess],
            CustomerAction::ReportDeliveryFailure => &[Shipped],
        }
    }

    pub fn check(self, from: OrderStatus) -> OrderResult<()> {
        if self.allowed_from().contains(&from) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                from,
                to: self.target(),
            })
        }
    }

    pub fn default_note(self) -> &'static str {
        match self {
            CustomerAction::Cancel => "Cancelled by customer",
            CustomerAction::ConfirmDelivery => "Delivery confirmed by customer",
            CustomerAction::RequestReturn => "Return requested by customer",
            CustomerAction::ConfirmSatisfaction => "Order completed by customer",
            CustomerAction::RequestRefund => "Refund requested by customer",
            CustomerAction::ReportDeliveryFailure => "Delivery failure reported by customer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_terminal_states_have_no_admin_edges() {
        for status in [Completed, Cancelled, Refunded] {
            assert!(admin_targets(status).is_empty());
            for to in OrderStatus::ALL {
                assert!(check_admin(status, to).is_err());
            }
        }
    }

    #[test]
    fn test_shipped_is_not_admin_controllable() {
        for to in OrderStatus::ALL {
            assert!(matches!(
                check_admin(Shipped, to),
                Err(OrderError::NotAdminControllable(Shipped))
            ));
            assert!(matches!(
                check_admin(DeliveredSuccess, to),
                Err(OrderError::NotAdminControllable(DeliveredSuccess))
            ));
        }
    }

    #[test]
    fn test_nothing_returns_to_draft() {
        for from in OrderStatus::ALL {
            assert!(!admin_targets(from).contains(&Draft));
            assert!(!courier_targets(from).contains(&Draft));
        }
    }

    #[test]
    fn test_admin_table() {
        assert!(check_admin(Draft, Pending).is_ok());
        assert!(check_admin(Pending, Confirmed).is_ok());
        assert!(check_admin(Processing, Shipped).is_ok());
        assert!(check_admin(DeliveredFailed, Shipped).is_ok());
        assert!(check_admin(ReturnCompleted, Refunded).is_ok());
        assert!(check_admin(PaymentFailed, Cancelled).is_ok());

        assert!(matches!(
            check_admin(Pending, Shipped),
            Err(OrderError::InvalidTransition { .. })
        ));
        assert!(check_admin(PaymentFailed, Pending).is_err());
        assert!(check_admin(ReturnPending, ReturnCompleted).is_err());
    }

    #[test]
    fn test_every_illegal_pair_is_rejected() {
        let mut allowed = 0;
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                if check_admin(from, to).is_ok() {
                    allowed += 1;
                    assert!(admin_targets(from).contains(&to));
                }
            }
        }
        let table_size: usize = OrderStatus::ALL.iter().map(|s| admin_targets(*s).len()).sum();
        assert_eq!(allowed, table_size);
    }

    #[test]
    fn test_customer_actions() {
        assert!(CustomerAction::Cancel.check(PaymentFailed).is_ok());
        assert!(CustomerAction::Cancel.check(Processing).is_err());
        assert!(CustomerAction::RequestReturn.check(Shipped).is_ok());
        assert!(CustomerAction::RequestRefund.check(Shipped).is_err());
        assert!(CustomerAction::ReportDeliveryFailure.check(DeliveredSuccess).is_err());
        assert_eq!(CustomerAction::ConfirmSatisfaction.target(), Completed);
    }

    #[test]
    fn test_courier_only_from_shipped() {
        assert!(check_courier(Shipped, PartiallyDelivered).is_ok());
        assert!(check_courier(Processing, DeliveredSuccess).is_err());
        assert!(check_courier(Shipped, Cancelled).is_err());
    }
}
