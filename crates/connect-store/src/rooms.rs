//! In-memory room repository

use async_trait::async_trait;
use connect_core::{
    DomainError, ParticipantRole, RepoResult, Room, RoomId, RoomRepository, UserId,
};
use dashmap::DashMap;

/// `RoomRepository` backed by a process-local map
#[derive(Debug, Default)]
pub struct MemoryRoomRepository {
    rooms: DashMap<RoomId, Room>,
}

impl MemoryRoomRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms stored
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[async_trait]
impl RoomRepository for MemoryRoomRepository {
    async fn get(&self, room_id: RoomId) -> RepoResult<Room> {
        self.rooms
            .get(&room_id)
            .map(|r| r.clone())
            .ok_or(DomainError::RoomNotFound(room_id))
    }

    async fn participants(&self, room_id: RoomId) -> RepoResult<Vec<UserId>> {
        self.rooms
            .get(&room_id)
            .map(|r| r.participant_ids())
            .ok_or(DomainError::RoomNotFound(room_id))
    }

    async fn role_of(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> RepoResult<Option<ParticipantRole>> {
        self.rooms
            .get(&room_id)
            .map(|r| r.role_of(user_id))
            .ok_or(DomainError::RoomNotFound(room_id))
    }

    async fn rooms_for_user(&self, user_id: UserId) -> RepoResult<Vec<Room>> {
        Ok(self
            .rooms
            .iter()
            .filter(|r| r.is_participant(user_id))
            .map(|r| r.clone())
            .collect())
    }

    async fn create(&self, room: Room) -> RepoResult<()> {
        tracing::debug!(room_id = %room.id, participants = room.participants.len(), "Room created");
        self.rooms.insert(room.id, room);
        Ok(())
    }

    async fn add_participant(
        &self,
        room_id: RoomId,
        user_id: UserId,
        role: ParticipantRole,
    ) -> RepoResult<()> {
        let mut room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))?;
        room.participants.insert(user_id, role);
        Ok(())
    }

    async fn remove_participant(&self, room_id: RoomId, user_id: UserId) -> RepoResult<()> {
        let mut room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))?;
        if room.participants.remove(&user_id).is_none() {
            return Err(DomainError::NotParticipant(room_id));
        }
        Ok(())
    }

    async fn touch_last_activity(
        &self,
        room_id: RoomId,
        preview: Option<String>,
    ) -> RepoResult<()> {
        let mut room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))?;
        room.touch(preview);
        Ok(())
    }

    async fn update_settings(
        &self,
        room_id: RoomId,
        name: Option<String>,
        is_private: Option<bool>,
    ) -> RepoResult<()> {
        let mut room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))?;
        if name.is_some() {
            room.name = name;
        }
        if let Some(private) = is_private {
            room.is_private = private;
        }
        Ok(())
    }
}
