//! Payment reconciliation
//!
//! One [`PaymentAdapter`] per provider behind a [`PaymentRegistry`]; every
//! verified callback funnels into the same two order entry points through
//! [`PaymentReconciler`].
//!
//! | Method | Callback | Signature |
//! |--------|----------|-----------|
//! | `cod` | none | - |
//! | `card` | Stripe webhook | HMAC-SHA256 `t.body` |
//! | `momo` | JSON IPN | HMAC-SHA256 sorted fields |
//! | `zalopay` | JSON `{data, mac}` | HMAC-SHA256 key2 over `data` |
//! | `vnpay` | GET IPN | HMAC-SHA512 sorted query |

pub mod adapter;
pub mod card;
pub mod cod;
pub mod error;
pub mod momo;
pub mod reconciler;
pub mod registry;
pub(crate) mod signing;
pub mod vnpay;
pub mod zalopay;

pub use adapter::{CallbackAck, PaymentAdapter, RawCallback, VerifiedCallback};
pub use error::PaymentError;
pub use reconciler::PaymentReconciler;
pub use registry::{PaymentRegistry, PaymentsConfig};
