//! Reqwest-backed request client for the sensor gateway.
//!
//! Implements [`gateway_core::RequestClient`] on top of a shared reqwest
//! connection pool and maps transport failures into the gateway's error
//! classification.

mod client;

pub use client::HttpRequestClient;
