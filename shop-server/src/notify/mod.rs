//! Order notifications: broadcast after commit, fanned out to sinks

pub mod dispatcher;
pub mod router;
pub mod sinks;

pub use dispatcher::NotificationDispatcher;
pub use router::NotificationRouter;
pub use sinks::{LogSink, NotificationSink, WebhookSink, run_sink};
