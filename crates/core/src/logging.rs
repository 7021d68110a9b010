//! Logging infrastructure.
//!
//! Initializes the tracing subscriber once per process. Logs go to stderr
//! so stdout stays clean for JSON/data output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{RagError, RagResult};

/// Initialize the tracing subscriber with stderr output.
///
/// The filter is taken from `log_level` if given, otherwise from `RUST_LOG`,
/// defaulting to `info`. ANSI colors are disabled when `NO_COLOR` is set.
pub fn init_logging(log_level: Option<&str>) -> RagResult<()> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    let env_filter = EnvFilter::try_new(filter_str)
        .map_err(|e| RagError::Config(format!("Invalid log filter '{}': {}", filter_str, e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(std::env::var("NO_COLOR").is_err());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| RagError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}
