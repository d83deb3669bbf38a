//! Sensor gateway - samples sensor data and delivers it to the time-series
//! and asset services.

mod app;

use clap::Parser;
use gateway_config::{init_logging, Config};
use std::path::PathBuf;
use tracing::error;

/// Exit status when the configuration cannot be loaded.
const EXIT_BAD_CONFIG: i32 = 5;

/// Sensor gateway command-line interface.
#[derive(Parser)]
#[command(name = "sensor-gateway")]
#[command(about = "Delivers sampled sensor telemetry to the cloud services")]
#[command(version)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "conf/gateway.json")]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            // Logging is configured from the file we just failed to read,
            // so this one goes straight to stderr.
            eprintln!("ERROR: {err}");
            std::process::exit(EXIT_BAD_CONFIG);
        }
    };

    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(&level);

    let err = match app::run(config).await {
        Ok(never) => match never {},
        Err(err) => err,
    };
    error!(error = %err, exit_code = err.exit_code(), "exiting on unrecoverable failure");
    std::process::exit(err.exit_code());
}
