//! Shop Server - 订单生命周期与库存占用引擎
//!
//! # 架构概述
//!
//! - **库存** (`inventory`): on-hand ledger, cart reservations, expiry sweeper
//! - **订单** (`orders`): state machine, side effects, pricing, draft expiry
//! - **支付** (`payments`): COD / card / MoMo / ZaloPay / VNPay adapters and the callback reconciler
//! - **通知** (`notify`): post-commit order notifications fanned out to sinks
//! - **HTTP API** (`api`): axum routes
//!
//! # 模块结构
//!
//! ```text
//! shop-server/src/
//! ├── core/          # 配置、状态、后台任务、服务器
//! ├── auth/          # JWT 校验、CurrentUser
//! ├── db/            # redb 表定义
//! ├── inventory/     # 库存与占用
//! ├── orders/        # 订单生命周期
//! ├── payments/      # 支付适配器
//! ├── notify/        # 订单通知
//! ├── address/       # 省市目录缓存
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志
//! ```

pub mod address;
pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod inventory;
pub mod notify;
pub mod orders;
pub mod payments;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use inventory::InventoryService;
pub use orders::OrdersManager;
pub use shared::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Audit logging macro - 订单状态变更、库存扣减 / 回补
#[macro_export]
macro_rules! audit_log {
    ($($arg:tt)*) => {
        tracing::info!(target: "audit", $($arg)*)
    };
}

/// Security logging macro - 签名校验失败、认证失败
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "WARN",
            $($arg)*
        );
    };
    (ERROR, $event:expr, $($arg:tt)*) => {
        tracing::error!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "ERROR",
            $($arg)*
        );
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "INFO",
            $($arg)*
        );
    };
}

/// 设置环境: dotenv、配置、工作目录、日志
///
/// Returns the loaded configuration and whether logs go to files.
pub fn setup_environment() -> anyhow::Result<(Config, bool)> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.work_dir)?;

    let log_dir = config.log_dir();
    let log_to_files = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Cannot create log dir {}: {e}, logging to console only", log_dir.display());
            false
        }
    };

    if log_to_files {
        init_logger_with_file(&config.log_level, config.log_json, log_dir.to_str())?;
    } else {
        init_logger(&config.log_level, config.log_json)?;
    }

    if config.is_development() && std::env::var("JWT_SECRET").is_err() {
        tracing::warn!("JWT_SECRET not set, using a generated development key");
    }

    Ok((config, log_to_files))
}

pub fn print_banner() {
    println!(
        r#"
      _
  ___| |__   ___  _ __        ___  ___ _ ____   _____ _ __
 / __| '_ \ / _ \| '_ \ _____/ __|/ _ \ '__\ \ / / _ \ '__|
 \__ \ | | | (_) | |_) |_____\__ \  __/ |   \ V /  __/ |
 |___/_| |_|\___/| .__/      |___/\___|_|    \_/ \___|_|
                 |_|
    "#
    );
}
