//! Tracing subscriber bootstrap. Logs go to stderr so stdout stays
//! machine-readable under `--json`.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Environment variable holding a filter directive; wins over config.
pub const LOG_ENV: &str = "REQLEDGER_LOG";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_subscriber(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Text => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
