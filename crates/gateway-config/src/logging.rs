//! Logging initialization for the gateway.

use tracing_subscriber::EnvFilter;

/// Initialize the logging system.
///
/// Sets up tracing with formatted output to stderr and the level taken from
/// `RUST_LOG` when set, falling back to the provided default.
///
/// # Example
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("gateway started");
/// ```
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
