//! Delivery/dispatch subsystem for the sensor gateway.
//!
//! This crate provides:
//! - [`TransactionQueue`]: ordered, mutex-guarded buffer with
//!   transaction-tagged commit/rollback semantics
//! - [`TransactionCounter`]: the shared, monotonically increasing
//!   send-attempt counter
//! - [`TelemetrySink`]: the thread-safe enqueue handle handed to producers
//! - [`TimeseriesDispatcher`] and [`AssetDispatcher`]: one drain-and-send
//!   cycle per destination
//! - [`DispatchWorker`]: the outer login/connect/dispatch loop with the
//!   rollback-then-classify retry policy

mod asset;
mod queue;
mod sink;
mod timeseries;
mod worker;

pub use asset::{AssetDispatcher, AssetTarget};
pub use queue::{TransactionCounter, TransactionQueue};
pub use sink::TelemetrySink;
pub use timeseries::TimeseriesDispatcher;
pub use worker::{DispatchWorker, DispatchWorkerConfig};
