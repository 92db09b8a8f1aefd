//! Draft order expiry
//!
//! Online orders hold deducted stock while they wait for the provider. An
//! order still in `draft` / `payment_failed` after the TTL is cancelled,
//! which restores its stock through the normal cancellation path.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::OrdersManager;

pub struct DraftSweeper {
    orders: OrdersManager,
    ttl_ms: i64,
    period: Duration,
    shutdown: CancellationToken,
}

impl DraftSweeper {
    pub fn new(
        orders: OrdersManager,
        ttl_minutes: u64,
        period: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            orders,
            ttl_ms: shared::util::minutes_to_millis(ttl_minutes),
            period,
            shutdown,
        }
    }

    pub async fn run(self) {
        tracing::info!(
            ttl_minutes = self.ttl_ms / 60_000,
            period_secs = self.period.as_secs(),
            "DraftSweeper started"
        );
        let mut interval = tokio::time::interval(self.period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.orders.expire_stale_drafts(self.ttl_ms) {
                        Ok(0) => {}
                        Ok(n) => tracing::info!(cancelled = n, "Expired unpaid draft orders"),
                        Err(e) => tracing::error!(error = %e, "Draft sweep failed"),
                    }
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("DraftSweeper received shutdown signal");
                    return;
                }
            }
        }
    }
}
