//! Inventory - stock ledger, cart reservations and the service over both
//!
//! # 模块结构
//!
//! - [`ledger`] - on-hand counters and the catalog projection
//! - [`reservations`] - per-owner time-bounded holds
//! - [`InventoryService`] - availability, deduction, restoration, holds
//! - [`ReservationSweeper`] - periodic expiry of abandoned holds

pub mod error;
pub(crate) mod ledger;
pub(crate) mod reservations;
pub mod service;
pub mod sweeper;

pub use error::{InventoryError, InventoryResult, unavailable_error};
pub use service::{Evaluation, InventoryService, ResolvedLine};
pub use sweeper::ReservationSweeper;
