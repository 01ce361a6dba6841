//! Wire events
//!
//! Closed tagged-variant types for every inbound and outbound event. Unknown
//! event names or malformed payloads fail deserialization at the boundary
//! instead of flowing into handlers.

mod client_event;
mod server_event;

pub use client_event::ClientEvent;
pub use server_event::ServerEvent;
