//! Order lifecycle
//!
//! - **manager**: [`OrdersManager`], the only writer of order documents
//! - **state_machine**: admin / customer / courier edge sets
//! - **effects**: side effects bound to target states (stock restore, stamps)
//! - **pricing**: subtotal, voucher, shipping, tax
//! - **storage**: redb tables for orders, indexes, callback idempotency, vouchers
//! - **draft_sweeper**: cancels unpaid online orders past their deadline
//!
//! # Architecture
//!
//! ```text
//! HTTP / payment callback → OrdersManager → WriteTransaction
//!                                  │           ├── orders (+ indexes)
//!                                  │           └── stock (InventoryService)
//!                                  ↓
//!                        NotificationDispatcher (after commit)
//! ```

pub mod draft_sweeper;
pub mod effects;
pub mod error;
pub mod manager;
pub mod pricing;
pub mod state_machine;
pub(crate) mod storage;

pub use draft_sweeper::DraftSweeper;
pub use error::{OrderError, OrderResult};
pub use manager::{OrdersManager, PaymentConfirmation, PaymentFailureOutcome};
pub use pricing::PricingConfig;
pub use state_machine::CustomerAction;
