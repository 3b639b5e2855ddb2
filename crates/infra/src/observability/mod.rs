//! Logging setup
//!
//! Installs a global `tracing` subscriber. `RUST_LOG` wins over the
//! configured level; the configured level wins over the built-in default.

use tracing_subscriber::EnvFilter;
use washslot_domain::{LoggingConfig, Result, WashSlotError};

/// Crates whose debug output drowns ours.
const QUIET_CRATES: &str = ",tokio_cron_scheduler=warn";

/// Build the filter the subscriber will use.
///
/// # Errors
/// Returns `WashSlotError::Config` if the configured level is not a valid
/// filter directive.
pub fn build_filter(logging: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(format!("{}{QUIET_CRATES}", logging.level)).map_err(|e| {
        WashSlotError::Config(format!("invalid log level '{}': {e}", logging.level))
    })
}

/// Initialize the global subscriber, human-readable or JSON.
///
/// # Errors
/// Returns `WashSlotError::Config` for an invalid level and
/// `WashSlotError::Internal` if a global subscriber is already installed.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = build_filter(logging)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let installed = if logging.json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.compact().try_init()
    };

    installed.map_err(|e| WashSlotError::Internal(format!("tracing already initialized: {e}")))?;
    tracing::debug!(level = %logging.level, json = logging.json, "tracing initialized");
    Ok(())
}
