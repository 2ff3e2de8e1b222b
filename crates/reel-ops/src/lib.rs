//! Operational helpers: logging setup.

use reel_types::{config::OpsConfig, ReelError, Result};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber. `RUST_LOG`-style directives in
/// `log_level` are honoured; an unparsable value falls back to `info`.
pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = build_filter(&config.log_level)?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ReelError::Ops(format!("tracing init error: {err}")))?;
    debug!(level = %config.log_level, "tracing initialised");
    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| ReelError::Ops(format!("failed to create log filter: {err}")))
}
