//! Typing-state tracker
//!
//! Ephemeral per-room set of users currently composing a message. Entries
//! carry their insertion time so a periodic sweep can expire the ones whose
//! stop event was lost.

use connect_core::{RoomId, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Outcome of a stop-typing mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTyping {
    /// The user was not in the typing set; nothing to broadcast
    NotTyping,
    /// Removed, but others are still typing; no broadcast
    StillTyping,
    /// Removed and the room's typing set became empty; broadcast once
    RoomIdle,
}

/// Per-room typing sets with insertion timestamps
#[derive(Debug, Default)]
pub struct TypingTracker {
    typing: DashMap<RoomId, HashMap<UserId, Instant>>,
}

impl TypingTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a user as typing; returns true if newly added (broadcast
    /// `user_typing` only on the first start, not on keystroke repeats)
    pub fn start(&self, room_id: RoomId, user_id: UserId) -> bool {
        self.typing
            .entry(room_id)
            .or_default()
            .insert(user_id, Instant::now())
            .is_none()
    }

    /// Remove a user from the room's typing set
    pub fn stop(&self, room_id: RoomId, user_id: UserId) -> StopTyping {
        if let Entry::Occupied(mut occupied) = self.typing.entry(room_id) {
            if occupied.get_mut().remove(&user_id).is_none() {
                return StopTyping::NotTyping;
            }
            if occupied.get().is_empty() {
                occupied.remove();
                return StopTyping::RoomIdle;
            }
            return StopTyping::StillTyping;
        }
        StopTyping::NotTyping
    }

    /// Remove a user from every typing set (disconnect cleanup); returns
    /// the rooms whose sets became empty and need the idle broadcast
    pub fn remove_user(&self, user_id: UserId) -> Vec<RoomId> {
        let rooms: Vec<RoomId> = self
            .typing
            .iter()
            .filter(|entry| entry.contains_key(&user_id))
            .map(|entry| *entry.key())
            .collect();

        rooms
            .into_iter()
            .filter(|room_id| self.stop(*room_id, user_id) == StopTyping::RoomIdle)
            .collect()
    }

    /// Expire entries older than `ttl`; returns the rooms whose sets became
    /// empty. Covers the lost-stop-event case.
    pub fn expire_stale(&self, ttl: Duration) -> Vec<RoomId> {
        let mut idle_rooms = Vec::new();

        self.typing.retain(|room_id, entries| {
            let before = entries.len();
            entries.retain(|_, started| started.elapsed() < ttl);
            if entries.is_empty() {
                if before > 0 {
                    idle_rooms.push(*room_id);
                }
                false
            } else {
                true
            }
        });

        idle_rooms
    }

    /// Users currently typing in a room
    #[must_use]
    pub fn typists(&self, room_id: RoomId) -> Vec<UserId> {
        self.typing
            .get(&room_id)
            .map(|entries| entries.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Whether anyone is typing in the room
    #[must_use]
    pub fn anyone_typing(&self, room_id: RoomId) -> bool {
        self.typing.contains_key(&room_id)
    }
}
