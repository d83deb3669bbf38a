//! Asset drain-and-send cycle.

use crate::{TransactionCounter, TransactionQueue};
use gateway_core::{
    validate_response, AssetRecord, GatewayError, GatewayResult, PostRequest, RequestClient,
    CONTENT_TYPE_JSON,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Asset service endpoint settings.
#[derive(Debug, Clone)]
pub struct AssetTarget {
    /// Base URL of the asset service; the collection name is appended.
    pub base_url: String,
    /// Tenant/zone identifier sent on every request.
    pub zone_id: String,
    /// Collection the records are posted to.
    pub collection: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

/// One element of the posted JSON array.
#[derive(Debug, Serialize)]
struct AssetEntry<'a> {
    uri: String,
    sensor_id: &'a str,
    timestamp: i64,
    val: f64,
    msg: &'a str,
}

/// Drains the asset queue with one authenticated POST per cycle.
pub struct AssetDispatcher {
    queue: Arc<TransactionQueue<AssetRecord>>,
    client: Arc<dyn RequestClient>,
    target: AssetTarget,
}

impl AssetDispatcher {
    /// Create a dispatcher draining `queue` against `target`.
    pub fn new(
        queue: Arc<TransactionQueue<AssetRecord>>,
        client: Arc<dyn RequestClient>,
        target: AssetTarget,
    ) -> Self {
        Self {
            queue,
            client,
            target,
        }
    }

    /// Run one drain-and-send cycle.
    ///
    /// The transaction id is allocated unconditionally, mirroring the
    /// time-series side's bookkeeping even when there is nothing to send.
    /// Each record is posted with a fresh resource identifier under the
    /// configured collection.
    pub async fn dispatch(
        &self,
        bearer_token: &str,
        counter: &TransactionCounter,
    ) -> GatewayResult<()> {
        let transaction_id = counter.next();

        if !self.queue.has_pending() {
            return Ok(());
        }
        let batch = self.queue.begin(transaction_id);
        if batch.is_empty() {
            return Ok(());
        }

        debug!(
            count = batch.len(),
            transaction_id, "sending records to the asset service"
        );

        let entries: Vec<AssetEntry> = batch
            .iter()
            .map(|record| AssetEntry {
                uri: format!("{}/{}", self.target.collection, Uuid::new_v4()),
                sensor_id: &record.sensor_id,
                timestamp: record.timestamp,
                val: record.value,
                msg: &record.note,
            })
            .collect();
        let body = serde_json::to_string(&entries)
            .map_err(|e| GatewayError::Generic(format!("failed to encode asset batch: {e}")))?;

        let url = format!(
            "{}/{}",
            self.target.base_url.trim_end_matches('/'),
            self.target.collection
        );
        let request = PostRequest::new(url, body, CONTENT_TYPE_JSON, self.target.timeout)
            .header("Authorization", format!("Bearer {bearer_token}"))
            .header("Predix-Zone-Id", self.target.zone_id.clone());

        let response = self.client.post(request).await?;
        validate_response(&response)?;

        let committed = self.queue.commit(transaction_id);
        debug!(committed, transaction_id, "committed asset transaction");
        Ok(())
    }
}
