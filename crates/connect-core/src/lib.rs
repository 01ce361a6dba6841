//! # connect-core
//!
//! Domain layer for the EventConnect realtime service: typed identifiers,
//! entities, wire events, the error taxonomy, and collaborator traits.
//! This crate has zero dependencies on infrastructure (transport, store, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod ids;
pub mod traits;

// Re-export commonly used types at crate root
pub use entities::{
    AttachmentRef, ChatMessage, MessageKind, ParticipantRole, PresenceStatus, QueuedMessage,
    Room, RoomKind, MAX_CONTENT_LENGTH,
};
pub use error::DomainError;
pub use events::{ClientEvent, ServerEvent};
pub use ids::{EndpointId, IdParseError, MessageId, RoomId, UserId};
pub use traits::{
    AuthProvider, AuthenticatedUser, MessageRepository, PresenceCache, RepoResult,
    RoomRepository,
};
