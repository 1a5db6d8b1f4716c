//! Tracing setup

use tracing_subscriber::EnvFilter;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install the global subscriber
///
/// The filter comes from `RUST_LOG` and falls back to `default_directive`.
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(default_directive: &str, format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.is_ok()
}
