//! Domain entities

mod message;
mod presence;
mod room;

pub use message::{AttachmentRef, ChatMessage, MessageKind, QueuedMessage, MAX_CONTENT_LENGTH};
pub use presence::PresenceStatus;
pub use room::{ParticipantRole, Room, RoomKind};
