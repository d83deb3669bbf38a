//! Composition root: builds the components and runs the two tasks.

use gateway_auth::{AuthConfig, AuthSession};
use gateway_config::Config;
use gateway_core::GatewayError;
use gateway_dispatch::{
    AssetDispatcher, AssetTarget, DispatchWorker, DispatchWorkerConfig, TelemetrySink,
    TimeseriesDispatcher, TransactionQueue,
};
use gateway_http::HttpRequestClient;
use gateway_sampler::{Sampler, SamplerParams};
use gateway_stream::{WsConfig, WsConnector};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

/// Wire up the queues, session, transports and workers, then run the
/// producer and dispatcher until the dispatcher hits an unrecoverable
/// failure.
pub async fn run(config: Config) -> Result<Infallible, GatewayError> {
    info!(client_id = %config.sensor.client_id, "starting sensor gateway");

    let http = Arc::new(HttpRequestClient::new()?);
    let timeseries_queue = Arc::new(TransactionQueue::new());
    let asset_queue = Arc::new(TransactionQueue::new());

    let session = AuthSession::new(
        http.clone(),
        AuthConfig {
            uaa_url: config.uaa.url.clone(),
            client_id: config.sensor.client_id.clone(),
            client_secret: config.sensor.client_secret.clone(),
            timeout: config.request_timeout(),
        },
    );

    let connector = WsConnector::new(WsConfig {
        url: config.timeseries.ingest_url.clone(),
        zone_id: config.timeseries.zone_id.clone(),
        client_id: config.sensor.client_id.clone(),
        timeout: config.request_timeout(),
    });

    let worker = DispatchWorker::new(
        session,
        connector,
        TimeseriesDispatcher::new(timeseries_queue.clone()),
        AssetDispatcher::new(
            asset_queue.clone(),
            http,
            AssetTarget {
                base_url: config.asset.base_url.clone(),
                zone_id: config.asset.zone_id.clone(),
                collection: config.asset.collection.clone(),
                timeout: config.request_timeout(),
            },
        ),
        timeseries_queue.clone(),
        asset_queue.clone(),
        DispatchWorkerConfig {
            idle_interval: config.dispatch_idle(),
            error_backoff: config.error_backoff(),
        },
    );

    let sampler = Sampler::new(
        TelemetrySink::new(timeseries_queue, asset_queue),
        config.sensor.client_id.clone(),
        SamplerParams {
            p: config.sensor.sampler.p,
            m: config.sensor.sampler.m,
            interval: std::time::Duration::from_millis(config.sensor.sampler.interval_ms),
        },
    );

    // Producer task; the dispatch loop runs on this task and owns the
    // process outcome.
    tokio::spawn(sampler.run());
    Err(worker.run().await)
}
