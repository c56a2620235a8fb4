//! Reporting for the logger's own problems
//!
//! Sink failures, capability downgrades and rejected settings are emitted as
//! `tracing` events. Libraries embedding m3log usually already have a
//! subscriber; the binary installs this one.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding an `EnvFilter` directive for diagnostics
pub const DIAGNOSTICS_ENV: &str = "M3LOG_DIAGNOSTICS";

/// Filter used when `M3LOG_DIAGNOSTICS` is unset or invalid
pub const DEFAULT_FILTER: &str = "m3log=warn";

/// Install a stderr subscriber for diagnostics
///
/// Does nothing if a global subscriber is already set.
pub fn init() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_env(DIAGNOSTICS_ENV)
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}
