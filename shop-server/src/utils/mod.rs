//! 工具模块

pub mod logger;

pub use logger::{cleanup_old_logs, init_logger, init_logger_with_file};
