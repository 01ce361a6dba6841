//! Collaborator traits
//!
//! The realtime service talks to the durable store, the authentication
//! provider, and the presence cache exclusively through these traits.

mod providers;
mod repositories;

pub use providers::{AuthProvider, AuthenticatedUser, PresenceCache};
pub use repositories::{MessageRepository, RepoResult, RoomRepository};
