use tracing_subscriber::EnvFilter;

use crate::error::RelayError;

/// Install a formatted `tracing` subscriber filtered by `filter`
/// (`EnvFilter` syntax, e.g. `"info,lending=debug"`). Blank text falls back
/// to `RUST_LOG`, then `info`. A subscriber installed earlier by the host
/// is left in place.
pub fn init(filter: &str) -> Result<(), RelayError> {
    let filter = if filter.trim().is_empty() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_new(filter).map_err(|e| RelayError::Configuration(format!("log filter: {e}")))?
    };

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        // Already initialized by the host or an earlier call.
    }
    Ok(())
}
