//! Shared types for the sensor gateway.
//!
//! This crate provides:
//! - The telemetry record types with their transaction tags
//! - The closed error classification every component raises failures as
//! - The transport traits the dispatchers are written against
//! - HTTP response validation

mod error;
mod transport;
mod types;

pub use error::{GatewayError, GatewayResult, Recovery};
pub use transport::{
    validate_response, HttpResponse, PostRequest, RequestClient, StreamConnector, TextStream,
    CONTENT_TYPE_FORM, CONTENT_TYPE_JSON,
};
pub use types::{AssetRecord, TimeseriesRecord, Transactional, TRANSACTION_NEW};
