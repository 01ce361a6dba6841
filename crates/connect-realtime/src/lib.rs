//! # connect-realtime
//!
//! The presence-aware realtime messaging core: connection registry, room
//! membership index, typing-state tracker, offline message queue, presence
//! publisher, session reconciler, and the message fan-out dispatcher, tied
//! together by [`RealtimeService`].
//!
//! All state here is process-local and in-memory; durable room membership
//! and message history live behind the collaborator traits in
//! `connect-core`. A process restart loses presence, typing, and queued
//! messages.

mod dispatcher;
mod endpoint;
mod offline;
mod presence;
mod reconciler;
mod registry;
mod rooms;
mod service;
mod typing;

pub use dispatcher::MessageDispatcher;
pub use endpoint::Endpoint;
pub use offline::OfflineQueue;
pub use presence::PresencePublisher;
pub use reconciler::SessionReconciler;
pub use registry::ConnectionRegistry;
pub use rooms::RoomIndex;
pub use service::RealtimeService;
pub use typing::{StopTyping, TypingTracker};
