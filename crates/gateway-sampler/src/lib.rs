//! Simulated sensor producer.
//!
//! Samples a uniform random value on a fixed interval and turns it into
//! telemetry: frequent small readings go to the time-series service, the
//! rare overload case additionally raises an asset event. The sampler only
//! ever talks to the thread-safe [`TelemetrySink`]; delivery happens on the
//! dispatch task.

use chrono::Utc;
use gateway_dispatch::TelemetrySink;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::interval;
use tracing::debug;

/// Event message attached to overload asset records.
const OVERLOAD_NOTE: &str = "ERROR: Sensor overloaded";

/// Sampling parameters.
#[derive(Debug, Clone)]
pub struct SamplerParams {
    /// Probability of a tick producing a time-series-only sample.
    pub p: f64,
    /// Probability of a tick additionally producing an asset event.
    pub m: f64,
    /// Time between ticks.
    pub interval: Duration,
}

/// What one sampled value turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickAction {
    /// Below `m`: a datapoint plus an overload event.
    TimeseriesAndAsset,
    /// Below `p + m`: a datapoint only.
    Timeseries,
    /// Everything else: nothing this tick.
    Noop,
}

fn classify_tick(value: f64, p: f64, m: f64) -> TickAction {
    if value < m {
        TickAction::TimeseriesAndAsset
    } else if value < p + m {
        TickAction::Timeseries
    } else {
        TickAction::Noop
    }
}

/// Periodic random-sampling producer.
pub struct Sampler {
    sink: TelemetrySink,
    sensor_id: String,
    params: SamplerParams,
}

impl Sampler {
    /// Create a sampler emitting records for `sensor_id`.
    pub fn new(sink: TelemetrySink, sensor_id: impl Into<String>, params: SamplerParams) -> Self {
        Self {
            sink,
            sensor_id: sensor_id.into(),
            params,
        }
    }

    /// Run the sampling loop forever.
    pub async fn run(self) {
        let mut rng = StdRng::from_entropy();
        let mut ticker = interval(self.params.interval);

        loop {
            ticker.tick().await;
            let value: f64 = rng.gen();
            let timestamp = Utc::now().timestamp_millis();

            match classify_tick(value, self.params.p, self.params.m) {
                TickAction::TimeseriesAndAsset => {
                    debug!(value, "sampled overload event");
                    self.sink.queue_timeseries(&self.sensor_id, timestamp, value);
                    self.sink
                        .queue_asset(&self.sensor_id, timestamp, value, OVERLOAD_NOTE);
                }
                TickAction::Timeseries => {
                    debug!(value, "sampled datapoint");
                    self.sink.queue_timeseries(&self.sensor_id, timestamp, value);
                }
                TickAction::Noop => {
                    debug!(value, "no-op tick");
                }
            }
        }
    }
}
