//! Logging Infrastructure
//!
//! Console output plus, when a log directory is given, three daily
//! rolling file streams split by tracing target:
//!
//! | Directory | Target | Retention |
//! |-----------|--------|-----------|
//! | `app/` | everything except `audit` / `security` | [`APP_LOG_RETENTION_DAYS`] |
//! | `audit/` | `audit` (order status changes, stock movements) | permanent |
//! | `security/` | `security` (rejected callbacks, auth failures) | permanent |

use std::fs;
use std::path::Path;
use tracing::Metadata;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Application logs older than this are removed by [`cleanup_old_logs`]
pub const APP_LOG_RETENTION_DAYS: i64 = 14;

const AUDIT_TARGET: &str = "audit";
const SECURITY_TARGET: &str = "security";

fn is_app(meta: &Metadata<'_>) -> bool {
    meta.target() != AUDIT_TARGET && meta.target() != SECURITY_TARGET
}

/// One rolling file stream under `dir/name/`, filtered by `keep`
fn file_layer<S>(
    dir: &Path,
    name: &str,
    json: bool,
    keep: fn(&Metadata<'_>) -> bool,
) -> anyhow::Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let sub_dir = dir.join(name);
    fs::create_dir_all(&sub_dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, sub_dir, name);
    let writer = std::sync::Mutex::new(appender);

    let layer = if json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_writer(writer)
            .with_filter(filter_fn(keep))
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter_fn(keep))
            .boxed()
    };
    Ok(layer)
}

/// Initialize the logging system
///
/// `RUST_LOG` wins over `level` when set.
///
/// ```no_run
/// // Development: pretty console only
/// shop_server::init_logger_with_file("debug", false, None)?;
///
/// // Production: JSON console + files
/// shop_server::init_logger_with_file("info", true, Some("./data/logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger_with_file(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let mut layers = vec![console];
    if let Some(dir) = log_dir {
        let dir = Path::new(dir);
        layers.push(file_layer(dir, "app", json_format, is_app)?);
        layers.push(file_layer(dir, AUDIT_TARGET, json_format, |m| m.target() == AUDIT_TARGET)?);
        layers.push(file_layer(dir, SECURITY_TARGET, json_format, |m| {
            m.target() == SECURITY_TARGET
        })?);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;
    Ok(())
}

/// Console-only logging
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}

/// Delete `app/app.YYYY-MM-DD` files older than `retention_days`.
///
/// Audit and security logs are never touched. Returns the number of
/// files removed.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: i64) -> anyhow::Result<usize> {
    let app_dir = log_dir.join("app");
    if !app_dir.exists() {
        return Ok(0);
    }
    let cutoff = chrono::Utc::now().date_naive() - chrono::Duration::days(retention_days);

    let mut removed = 0;
    for entry in fs::read_dir(&app_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(date_part) = name.strip_prefix("app.") else {
            continue;
        };
        if let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            removed += 1;
        }
    }
    Ok(removed)
}
