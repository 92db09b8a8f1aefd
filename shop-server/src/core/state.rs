use std::sync::Arc;
use std::time::Duration;

use crate::address::AddressDirectory;
use crate::auth::JwtService;
use crate::core::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::db::Store;
use crate::inventory::{InventoryService, ReservationSweeper};
use crate::notify::{LogSink, NotificationDispatcher, NotificationRouter, WebhookSink, run_sink};
use crate::orders::{DraftSweeper, OrdersManager};
use crate::payments::{PaymentReconciler, PaymentRegistry};
use crate::utils::{cleanup_old_logs, logger::APP_LOG_RETENTION_DAYS};

const SINK_BUFFER: usize = 256;
const ADDRESS_PURGE_INTERVAL: Duration = Duration::from_secs(600);
const LOG_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

/// 服务器状态 - 持有所有服务的共享引用
///
/// Cloned into every request by axum; every field is a cheap handle.
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | store | redb 数据库 |
/// | inventory | 库存 / 购物车占用 |
/// | orders | 订单生命周期 |
/// | reconciler | 支付回调处理 (持有 PaymentRegistry) |
/// | notifier | 订单通知广播 |
/// | address | 省市目录缓存 |
/// | jwt | JWT 校验 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub store: Store,
    pub inventory: InventoryService,
    pub orders: OrdersManager,
    pub reconciler: Arc<PaymentReconciler>,
    pub notifier: NotificationDispatcher,
    pub address: Arc<AddressDirectory>,
    pub jwt: Arc<JwtService>,
    http_client: reqwest::Client,
}

impl ServerState {
    /// Open the database under `work_dir` and wire every service
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let store = Store::open(config.database_path())?;
        tracing::info!(path = %config.database_path().display(), "Database opened");
        Self::with_store(config.clone(), store)
    }

    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder().timeout(OUTBOUND_TIMEOUT).build()?;

        let notifier = NotificationDispatcher::new();
        let inventory = InventoryService::new(store.clone(), config.reservation_ttl_minutes);
        let orders = OrdersManager::new(
            store.clone(),
            inventory.clone(),
            notifier.clone(),
            config.pricing.clone(),
        );

        let registry = PaymentRegistry::from_config(&config.payments)?;
        tracing::info!(methods = ?registry.methods(), "Payment methods available");
        let reconciler = PaymentReconciler::new(registry, orders.clone());

        let address = AddressDirectory::new(
            http_client.clone(),
            config.address_api_url.clone(),
            Duration::from_secs(config.address_cache_ttl_secs),
        );
        let jwt = JwtService::with_config(config.jwt.clone());

        Ok(Self {
            config: Arc::new(config),
            store,
            inventory,
            orders,
            reconciler: Arc::new(reconciler),
            notifier,
            address: Arc::new(address),
            jwt: Arc::new(jwt),
            http_client,
        })
    }

    pub fn payments(&self) -> &PaymentRegistry {
        self.reconciler.registry()
    }

    /// 启动后台任务
    ///
    /// - reservation / draft sweepers
    /// - notification router and its sinks
    /// - address cache purge
    /// - old log cleanup (only when logging to files)
    pub fn start_background_tasks(&self, log_to_files: bool) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();
        let config = &self.config;

        let sweeper = ReservationSweeper::new(
            self.inventory.clone(),
            Duration::from_secs(config.reservation_sweep_secs),
            tasks.shutdown_token(),
        );
        tasks.spawn("reservation_sweeper", TaskKind::Periodic, sweeper.run());

        let drafts = DraftSweeper::new(
            self.orders.clone(),
            config.draft_order_ttl_minutes,
            Duration::from_secs(config.draft_sweep_secs),
            tasks.shutdown_token(),
        );
        tasks.spawn("draft_sweeper", TaskKind::Periodic, drafts.run());

        // Notification fan-out
        let mut router = NotificationRouter::new();
        let log_rx = router.add_route("log", SINK_BUFFER);
        tasks.spawn(
            "notify_log_sink",
            TaskKind::Worker,
            run_sink(Box::new(LogSink), log_rx, tasks.shutdown_token()),
        );
        if let Some(url) = &config.notify_webhook_url {
            let webhook_rx = router.add_route("webhook", SINK_BUFFER);
            let sink = WebhookSink::new(self.http_client.clone(), url.clone());
            tasks.spawn(
                "notify_webhook_sink",
                TaskKind::Worker,
                run_sink(Box::new(sink), webhook_rx, tasks.shutdown_token()),
            );
        }
        tasks.spawn(
            "notification_router",
            TaskKind::Worker,
            router.run(self.notifier.subscribe(), tasks.shutdown_token()),
        );

        let address = self.address.clone();
        let token = tasks.shutdown_token();
        tasks.spawn("address_cache_purge", TaskKind::Periodic, async move {
            let mut interval = tokio::time::interval(ADDRESS_PURGE_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let purged = address.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged, "Address cache entries expired");
                        }
                    }
                    _ = token.cancelled() => break,
                }
            }
        });

        if log_to_files {
            let log_dir = config.log_dir();
            let token = tasks.shutdown_token();
            tasks.spawn("log_cleanup", TaskKind::Periodic, async move {
                let mut interval = tokio::time::interval(LOG_CLEANUP_INTERVAL);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            match cleanup_old_logs(&log_dir, APP_LOG_RETENTION_DAYS) {
                                Ok(0) => {}
                                Ok(removed) => tracing::info!(removed, "Old log files removed"),
                                Err(e) => tracing::warn!(error = %e, "Log cleanup failed"),
                            }
                        }
                        _ = token.cancelled() => break,
                    }
                }
            });
        }

        tasks.log_summary();
        tasks
    }
}

#[cfg(test)]
impl ServerState {
    /// Fresh state over an in-memory database
    pub fn for_tests() -> Self {
        let store = Store::open_in_memory().expect("in-memory database");
        Self::with_store(Config::default(), store).expect("test state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_tasks_start_and_stop() {
        let state = ServerState::for_tests();
        let tasks = state.start_background_tasks(false);
        // sweepers + log sink + router + address purge
        assert_eq!(tasks.count_by_kind(), (2, 3));
        tasks.shutdown().await;
    }

    #[test]
    fn test_cod_is_always_available() {
        let state = ServerState::for_tests();
        assert!(state.payments().is_available(shared::payment::PaymentMethod::Cod));
    }
}
