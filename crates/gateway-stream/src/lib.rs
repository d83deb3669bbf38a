//! WebSocket client for the time-series ingest channel.
//!
//! This crate provides:
//! - Connection establishment with bearer/zone/origin headers
//! - Blocking text-frame send/receive with per-call timeouts
//! - Classification of upgrade rejections and transport failures

mod client;

pub use client::{WsConfig, WsConnector, WsStream};
