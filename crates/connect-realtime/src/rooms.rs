//! Room membership index
//!
//! Live, process-local record of who has joined a room in this process.
//! Always a subset of the durable participant list; hydrated from the
//! store at connect time and pruned as users leave or disconnect.

use connect_core::{RoomId, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;

/// Index of live room membership
#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: DashMap<RoomId, HashSet<UserId>>,
}

impl RoomIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user to a room's live member set. Idempotent; returns true
    /// if the user was newly added.
    pub fn join(&self, room_id: RoomId, user_id: UserId) -> bool {
        self.rooms.entry(room_id).or_default().insert(user_id)
    }

    /// Remove a user from a room; prunes the entry when it becomes empty.
    /// Returns true if the user was a member.
    pub fn leave(&self, room_id: RoomId, user_id: UserId) -> bool {
        if let Entry::Occupied(mut occupied) = self.rooms.entry(room_id) {
            let removed = occupied.get_mut().remove(&user_id);
            if occupied.get().is_empty() {
                occupied.remove();
            }
            removed
        } else {
            false
        }
    }

    /// Remove a user from every room; returns the rooms they were in.
    /// Used when a user's last endpoint disconnects.
    pub fn leave_all(&self, user_id: UserId) -> Vec<RoomId> {
        let joined: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|entry| entry.contains(&user_id))
            .map(|entry| *entry.key())
            .collect();

        for room_id in &joined {
            self.leave(*room_id, user_id);
        }
        joined
    }

    /// The live member set of a room (possibly empty)
    #[must_use]
    pub fn members_of(&self, room_id: RoomId) -> Vec<UserId> {
        self.rooms
            .get(&room_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether a user has joined a room in this process
    #[must_use]
    pub fn is_member(&self, room_id: RoomId, user_id: UserId) -> bool {
        self.rooms
            .get(&room_id)
            .is_some_and(|set| set.contains(&user_id))
    }

    /// Number of rooms with at least one live member
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
