//! Order aggregate
//!
//! - [`Order`]: the order document with its append-only status history
//! - [`OrderStatus`]: lifecycle states
//! - request/response bodies of the order API

pub mod request;
pub mod status;
pub mod types;

// Re-exports
pub use request::*;
pub use status::OrderStatus;
pub use types::*;
