//! Configuration and logging setup for the sensor gateway.

mod config;
mod logging;

pub use config::{
    AssetConfig, Config, ConfigError, SamplerConfig, SensorConfig, TimeseriesConfig, UaaConfig,
};
pub use logging::init_logging;
