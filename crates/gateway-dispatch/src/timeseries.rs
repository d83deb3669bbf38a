//! Time-series drain-and-send cycle.

use crate::{TransactionCounter, TransactionQueue};
use gateway_core::{
    validate_response, GatewayError, GatewayResult, HttpResponse, TextStream, TimeseriesRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Quality marker sent on every datapoint.
const QUALITY_GOOD: i32 = 3;

/// Ingest envelope, one per transaction.
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    #[serde(rename = "messageId")]
    message_id: &'a str,
    body: Vec<TagGroup<'a>>,
}

/// Datapoints for one tag, in arrival order.
#[derive(Debug, Serialize)]
struct TagGroup<'a> {
    name: &'a str,
    datapoints: Vec<(i64, f64, i32)>,
}

/// Acknowledgment frame returned by the ingest service.
#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(rename = "statusCode")]
    status_code: i64,
    #[serde(rename = "messageId")]
    message_id: String,
}

/// Drains the time-series queue over the streaming connection.
pub struct TimeseriesDispatcher {
    queue: Arc<TransactionQueue<TimeseriesRecord>>,
}

impl TimeseriesDispatcher {
    /// Create a dispatcher draining `queue`.
    pub fn new(queue: Arc<TransactionQueue<TimeseriesRecord>>) -> Self {
        Self { queue }
    }

    /// Run one drain-and-send cycle.
    ///
    /// A no-op when nothing is pending. Otherwise: allocate a transaction
    /// id, tag the pending records, send them as one envelope, block for
    /// the acknowledgment and commit on success. Any failure propagates to
    /// the outer loop, which owns rollback and retry sequencing.
    pub async fn dispatch<S: TextStream>(
        &self,
        stream: &mut S,
        counter: &TransactionCounter,
    ) -> GatewayResult<()> {
        if !self.queue.has_pending() {
            return Ok(());
        }

        let transaction_id = counter.next();
        let batch = self.queue.begin(transaction_id);
        if batch.is_empty() {
            return Ok(());
        }

        debug!(
            count = batch.len(),
            transaction_id, "sending records to the time-series service"
        );

        let message_id = format!("msg-{transaction_id}");
        let envelope = build_envelope(&message_id, &batch);
        let frame = serde_json::to_string(&envelope)
            .map_err(|e| GatewayError::Generic(format!("failed to encode envelope: {e}")))?;

        stream.send_text(&frame).await?;
        let ack_text = stream.receive_text().await?;

        let ack: Ack = serde_json::from_str(&ack_text)
            .map_err(|e| GatewayError::Generic(format!("malformed acknowledgment: {e}")))?;

        // Acknowledgments carry HTTP-style status codes and classify the
        // same way as any other exchange.
        let status = u16::try_from(ack.status_code).map_err(|_| {
            GatewayError::Generic(format!(
                "time-series acknowledgment status {}",
                ack.status_code
            ))
        })?;
        validate_response(&HttpResponse {
            status,
            body: ack_text.clone(),
        })?;
        if ack.message_id != message_id {
            return Err(GatewayError::Generic(format!(
                "acknowledgment for {} does not match sent message {}",
                ack.message_id, message_id
            )));
        }

        let committed = self.queue.commit(transaction_id);
        debug!(committed, transaction_id, "committed time-series transaction");
        Ok(())
    }
}

/// Group a batch by tag name, preserving first-seen group order and
/// within-group arrival order.
fn build_envelope<'a>(message_id: &'a str, batch: &'a [TimeseriesRecord]) -> Envelope<'a> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<(i64, f64, i32)>> = HashMap::new();
    for record in batch {
        let datapoints = groups.entry(record.tag.as_str()).or_insert_with(|| {
            order.push(record.tag.as_str());
            Vec::new()
        });
        datapoints.push((record.timestamp, record.value, QUALITY_GOOD));
    }

    let body = order
        .into_iter()
        .map(|name| TagGroup {
            name,
            datapoints: groups.remove(name).unwrap_or_default(),
        })
        .collect();

    Envelope { message_id, body }
}
