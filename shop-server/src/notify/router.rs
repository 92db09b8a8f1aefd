//! Notification router - 通知分发
//!
//! ```text
//! NotificationDispatcher (broadcast)
//!        │
//!        └── NotificationRouter
//!               ├── mpsc ──► LogSink      [always]
//!               └── mpsc ──► WebhookSink  [when configured]
//! ```
//!
//! Every sink is best-effort: `try_send`, dropped with a warning when full.

use shared::OrderNotification;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

struct Route {
    name: &'static str,
    tx: mpsc::Sender<Arc<OrderNotification>>,
}

/// 通知路由器
#[derive(Default)]
pub struct NotificationRouter {
    routes: Vec<Route>,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink channel and return its receiving end
    pub fn add_route(
        &mut self,
        name: &'static str,
        buffer: usize,
    ) -> mpsc::Receiver<Arc<OrderNotification>> {
        let (tx, rx) = mpsc::channel(buffer);
        self.routes.push(Route { name, tx });
        rx
    }

    /// Runs until the source channel closes or shutdown is requested
    pub async fn run(
        self,
        mut source: broadcast::Receiver<OrderNotification>,
        shutdown: CancellationToken,
    ) {
        tracing::info!(sinks = self.routes.len(), "Notification router started");
        loop {
            let received = tokio::select! {
                received = source.recv() => received,
                _ = shutdown.cancelled() => {
                    tracing::info!("Notification router received shutdown signal");
                    break;
                }
            };
            match received {
                Ok(notification) => self.dispatch(notification),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged, notifications skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Notification source closed, router stopping");
                    break;
                }
            }
        }
    }

    fn dispatch(&self, notification: OrderNotification) {
        let notification = Arc::new(notification);
        for route in &self.routes {
            match route.tx.try_send(Arc::clone(&notification)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        sink = route.name,
                        order_id = %notification.order_id,
                        "Notification sink full, notification dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(sink = route.name, "Notification sink closed");
                }
            }
        }
    }
}
