//! Reservation expiry sweeper
//!
//! Abandoned carts must eventually give their holds back. Reads already
//! ignore expired holds; the sweeper flips them to `active = false` so the
//! table does not keep growing with dead rows.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::InventoryService;

/// 定期释放过期预留
pub struct ReservationSweeper {
    inventory: InventoryService,
    period: Duration,
    shutdown: CancellationToken,
}

impl ReservationSweeper {
    pub fn new(inventory: InventoryService, period: Duration, shutdown: CancellationToken) -> Self {
        Self {
            inventory,
            period,
            shutdown,
        }
    }

    pub async fn run(self) {
        tracing::info!(period_secs = self.period.as_secs(), "ReservationSweeper started");
        let mut interval = tokio::time::interval(self.period);

        loop {
            tokio::select! {
                _ = interval.tick() => self.sweep_once(),
                _ = self.shutdown.cancelled() => {
                    tracing::info!("ReservationSweeper received shutdown signal");
                    return;
                }
            }
        }
    }

    fn sweep_once(&self) {
        match self.inventory.cleanup_expired_reservations() {
            Ok(0) => {}
            Ok(n) => tracing::debug!(released = n, "Reservation sweep finished"),
            Err(e) => tracing::error!(error = %e, "Reservation sweep failed"),
        }
    }
}
