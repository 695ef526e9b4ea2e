//! Tracing setup: console layer (pretty or JSON) plus an optional JSON file sink.

use std::path::Path;

use eyre::{WrapErr, eyre};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::FILE_GUARD;

/// Precedence: `RUST_LOG`, then `--log-level`, then `logging.level`, then `info`.
pub fn filter_for(cli_level: Option<&str>, logging: &parkbay_config::Logging) -> eyre::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = cli_level.or(logging.level.as_deref()).unwrap_or("info");
    EnvFilter::try_new(level).map_err(|e| eyre!("invalid log level '{level}': {e}"))
}

pub fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &parkbay_config::Logging,
) -> eyre::Result<()> {
    let filter = filter_for(cli_level, logging)?;

    // Console always goes to stderr; stdout carries reports.
    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let console_pretty = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre!("logging.file {path:?} has no file name"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_pretty)
        .with(file)
        .try_init()
        .wrap_err("init tracing")
}
