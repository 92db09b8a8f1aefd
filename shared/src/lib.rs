//! Shared types for the shop backend
//!
//! Types used by the server and by any Rust client of its HTTP API:
//! error codes and response envelopes, the order aggregate, inventory
//! and reservation records, payment outcomes and lifecycle notifications.

pub mod error;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod payment;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use notification::{NotificationKind, OrderNotification};
pub use order::{Order, OrderStatus};
pub use payment::{PaymentMethod, PaymentOutcome, PaymentStatus};
