//! OAuth client-credentials session for the sensor gateway.
//!
//! This crate provides:
//! - The token fetch against the UAA `/oauth/token` endpoint
//! - The bearer-token session read by both dispatchers

mod session;

pub use session::{AuthConfig, AuthSession};
