//! Outer dispatch loop and retry policy.

use crate::{AssetDispatcher, TimeseriesDispatcher, TransactionCounter, TransactionQueue};
use gateway_auth::AuthSession;
use gateway_core::{AssetRecord, GatewayError, GatewayResult, Recovery, StreamConnector, TimeseriesRecord};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Dispatch loop timing configuration.
#[derive(Debug, Clone)]
pub struct DispatchWorkerConfig {
    /// Sleep between dispatch cycles while connected.
    pub idle_interval: Duration,
    /// Sleep before re-login after a transient failure.
    pub error_backoff: Duration,
}

impl Default for DispatchWorkerConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_millis(100),
            error_backoff: Duration::from_millis(5_000),
        }
    }
}

/// The dispatch loop: login, connect, then drain-and-send cycles until a
/// failure is raised.
///
/// Every failure first rolls back both queues (a failure on one
/// destination must not leave the other's in-flight records stuck) and is
/// then classified: transient classes sleep and restart from login,
/// a rejected token restarts immediately, everything else terminates the
/// worker.
pub struct DispatchWorker<C: StreamConnector> {
    session: AuthSession,
    connector: C,
    timeseries: TimeseriesDispatcher,
    assets: AssetDispatcher,
    timeseries_queue: Arc<TransactionQueue<TimeseriesRecord>>,
    asset_queue: Arc<TransactionQueue<AssetRecord>>,
    counter: TransactionCounter,
    config: DispatchWorkerConfig,
}

impl<C: StreamConnector> DispatchWorker<C> {
    /// Assemble a worker from its parts.
    pub fn new(
        session: AuthSession,
        connector: C,
        timeseries: TimeseriesDispatcher,
        assets: AssetDispatcher,
        timeseries_queue: Arc<TransactionQueue<TimeseriesRecord>>,
        asset_queue: Arc<TransactionQueue<AssetRecord>>,
        config: DispatchWorkerConfig,
    ) -> Self {
        Self {
            session,
            connector,
            timeseries,
            assets,
            timeseries_queue,
            asset_queue,
            counter: TransactionCounter::new(),
            config,
        }
    }

    /// Run the dispatch loop until an unrecoverable failure.
    ///
    /// Returns the failure; the caller decides how to terminate the
    /// process with it.
    pub async fn run(mut self) -> GatewayError {
        loop {
            let err = match self.session_cycle().await {
                Ok(never) => match never {},
                Err(err) => err,
            };

            // Roll back in-flight records on both queues before acting on
            // the classification.
            let rolled_back = self.timeseries_queue.rollback() + self.asset_queue.rollback();
            warn!(error = %err, rolled_back, "dispatch cycle failed");

            match err.recovery() {
                Recovery::Abort => {
                    error!(error = %err, "unrecoverable failure, stopping dispatch");
                    return err;
                }
                Recovery::RetryAfterBackoff => {
                    warn!(
                        backoff_ms = self.config.error_backoff.as_millis() as u64,
                        "transient failure, backing off before reconnecting"
                    );
                    tokio::time::sleep(self.config.error_backoff).await;
                }
                Recovery::RetryNow => {
                    info!("token rejected, refreshing and reconnecting");
                    self.session.invalidate();
                }
            }
        }
    }

    /// One login/connect/dispatch session. Only ever returns a failure.
    async fn session_cycle(&mut self) -> GatewayResult<Infallible> {
        let token = self.session.login().await?;
        let mut stream = self.connector.connect(&token).await?;

        loop {
            self.timeseries.dispatch(&mut stream, &self.counter).await?;
            self.assets.dispatch(&token, &self.counter).await?;
            tokio::time::sleep(self.config.idle_interval).await;
        }
    }
}
