//! # connect-gateway
//!
//! WebSocket gateway for the EventConnect realtime service. Authenticates
//! connections before the upgrade, bridges socket frames to the realtime
//! service, and runs per-connection heartbeats.

pub mod server;

pub use server::{create_app, run, GatewayState};
