//! # connect-store
//!
//! In-memory implementations of the durable-store collaborator traits.
//! The realtime subsystem deliberately excludes a persistence layer; these
//! stand in as the "external durable store" for runtime and tests, keeping
//! the trait seams identical to what a database-backed implementation
//! would present.

mod messages;
mod presence;
mod rooms;

pub use messages::MemoryMessageRepository;
pub use presence::MemoryPresenceCache;
pub use rooms::MemoryRoomRepository;
