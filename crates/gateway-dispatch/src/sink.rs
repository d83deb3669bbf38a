//! Producer-facing enqueue handle.

use crate::TransactionQueue;
use gateway_core::{AssetRecord, TimeseriesRecord};
use std::sync::Arc;
use tracing::trace;

/// Thread-safe handle producers use to queue telemetry for delivery.
///
/// Records are delivered asynchronously by the dispatch worker; both
/// methods append under the queue lock and return immediately.
#[derive(Clone)]
pub struct TelemetrySink {
    timeseries: Arc<TransactionQueue<TimeseriesRecord>>,
    assets: Arc<TransactionQueue<AssetRecord>>,
}

impl TelemetrySink {
    /// Create a sink feeding the given queues.
    pub fn new(
        timeseries: Arc<TransactionQueue<TimeseriesRecord>>,
        assets: Arc<TransactionQueue<AssetRecord>>,
    ) -> Self {
        Self { timeseries, assets }
    }

    /// Queue a datapoint for the time-series service.
    pub fn queue_timeseries(&self, tag: &str, timestamp: i64, value: f64) {
        trace!(tag, timestamp, value, "queueing time-series record");
        self.timeseries
            .enqueue(TimeseriesRecord::new(tag, timestamp, value));
    }

    /// Queue an event for the asset service.
    pub fn queue_asset(&self, sensor_id: &str, timestamp: i64, value: f64, note: &str) {
        trace!(sensor_id, timestamp, value, "queueing asset record");
        self.assets
            .enqueue(AssetRecord::new(sensor_id, timestamp, value, note));
    }
}
