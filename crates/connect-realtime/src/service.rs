//! Realtime service facade
//!
//! Owns the registry, room index, typing tracker, offline queue, presence
//! publisher, and dispatcher, and maps inbound client events onto them.
//! One instance per process, shared behind an `Arc` (no free-floating
//! globals, so tests get a fresh world each).

use crate::dispatcher::{MessageDispatcher, OutboundMessage};
use crate::endpoint::Endpoint;
use crate::offline::OfflineQueue;
use crate::presence::PresencePublisher;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomIndex;
use crate::typing::{StopTyping, TypingTracker};
use connect_common::RealtimeConfig;
use connect_core::{
    AttachmentRef, AuthProvider, ClientEvent, DomainError, EndpointId, MessageId, MessageKind,
    MessageRepository, ParticipantRole, PresenceCache, PresenceStatus, Room, RoomId,
    RoomKind, RoomRepository, ServerEvent, UserId,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Upper bound on search result size regardless of the client's ask
const MAX_SEARCH_LIMIT: usize = 100;

/// The realtime messaging service
pub struct RealtimeService {
    config: RealtimeConfig,
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomIndex>,
    typing: Arc<TypingTracker>,
    offline: Arc<OfflineQueue>,
    presence: PresencePublisher,
    dispatcher: MessageDispatcher,
    auth: Arc<dyn AuthProvider>,
    room_repo: Arc<dyn RoomRepository>,
    message_repo: Arc<dyn MessageRepository>,
}

impl RealtimeService {
    /// Wire up a service instance from its collaborators
    pub fn new(
        config: RealtimeConfig,
        auth: Arc<dyn AuthProvider>,
        room_repo: Arc<dyn RoomRepository>,
        message_repo: Arc<dyn MessageRepository>,
        presence_cache: Arc<dyn PresenceCache>,
    ) -> Arc<Self> {
        let registry = Arc::new(ConnectionRegistry::new(config.max_endpoints_per_user));
        let offline = Arc::new(OfflineQueue::new(config.offline_queue_limit));
        let presence = PresencePublisher::new(registry.clone(), presence_cache);
        let dispatcher = MessageDispatcher::new(
            registry.clone(),
            offline.clone(),
            room_repo.clone(),
            message_repo.clone(),
        );

        Arc::new(Self {
            config,
            registry,
            rooms: Arc::new(RoomIndex::new()),
            typing: Arc::new(TypingTracker::new()),
            offline,
            presence,
            dispatcher,
            auth,
            room_repo,
            message_repo,
        })
    }

    /// The connection registry
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// The live room membership index
    #[must_use]
    pub fn rooms(&self) -> &RoomIndex {
        &self.rooms
    }

    /// The typing tracker
    #[must_use]
    pub fn typing(&self) -> &TypingTracker {
        &self.typing
    }

    /// The offline queue
    #[must_use]
    pub fn offline(&self) -> &OfflineQueue {
        &self.offline
    }

    /// The presence publisher
    #[must_use]
    pub fn presence(&self) -> &PresencePublisher {
        &self.presence
    }

    /// Realtime tunables
    #[must_use]
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Verify a connect-time credential
    ///
    /// # Errors
    /// `AuthenticationFailed` for a bad credential, `AccountInactive` for a
    /// disabled account. No state is created on failure.
    pub async fn authenticate(&self, credential: &str) -> Result<UserId, DomainError> {
        let auth = self.auth.verify(credential).await?;
        if !auth.active {
            return Err(DomainError::AccountInactive);
        }
        Ok(auth.user_id)
    }

    /// Register a new endpoint for an authenticated user
    ///
    /// Hydrates live room membership from the durable participant lists,
    /// sends the `ready` handshake, publishes the online transition if this
    /// is the user's first endpoint, and replays the offline queue.
    pub async fn connect(
        &self,
        user_id: UserId,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<Arc<Endpoint>, DomainError> {
        let (endpoint, went_online) = self.registry.register(user_id, sender)?;

        // Hydrate: live membership mirrors durable membership at connect
        let rooms = match self.room_repo.rooms_for_user(user_id).await {
            Ok(rooms) => rooms,
            Err(e) => {
                // Unwind the registration so a failed connect leaves no state
                self.registry.unregister(endpoint.id());
                return Err(e);
            }
        };
        for room in &rooms {
            self.rooms.join(room.id, user_id);
        }

        let ready = ServerEvent::Ready {
            endpoint_id: endpoint.id(),
            user_id,
            rooms,
        };
        if endpoint.send(ready).await.is_err() {
            tracing::warn!(endpoint_id = %endpoint.id(), "Endpoint closed before ready");
        }

        if went_online {
            self.presence.publish(user_id, PresenceStatus::Online).await;
        }

        self.dispatcher.flush_offline(&endpoint).await;

        tracing::info!(
            endpoint_id = %endpoint.id(),
            user_id = %user_id,
            went_online = went_online,
            "Endpoint connected"
        );

        Ok(endpoint)
    }

    /// Tear down an endpoint (transport disconnect or reconciler sweep)
    ///
    /// When the user's last endpoint goes away, live room membership and
    /// typing state are cleaned up and the offline transition is published.
    pub async fn disconnect(&self, endpoint_id: EndpointId) {
        let Some((endpoint, went_offline)) = self.registry.unregister(endpoint_id) else {
            return;
        };
        let user_id = endpoint.user_id();

        if went_offline {
            self.rooms.leave_all(user_id);
            for room_id in self.typing.remove_user(user_id) {
                self.broadcast_to_room(room_id, &ServerEvent::UserStoppedTyping { room_id }, None)
                    .await;
            }
            self.presence.publish(user_id, PresenceStatus::Offline).await;
        }

        tracing::info!(
            endpoint_id = %endpoint_id,
            user_id = %user_id,
            went_offline = went_offline,
            "Endpoint disconnected"
        );
    }

    // =========================================================================
    // Inbound event handling
    // =========================================================================

    /// Handle one inbound client event
    ///
    /// # Errors
    /// Domain errors are returned to the transport layer, which forwards
    /// them to the caller as an `error` event; other room members never see
    /// another member's failures.
    pub async fn handle_event(
        &self,
        endpoint: &Arc<Endpoint>,
        event: ClientEvent,
    ) -> Result<(), DomainError> {
        let user_id = endpoint.user_id();
        tracing::trace!(
            endpoint_id = %endpoint.id(),
            user_id = %user_id,
            event = event.name(),
            "Handling client event"
        );

        match event {
            ClientEvent::JoinRoom { room_id } => self.join_room(user_id, room_id).await,
            ClientEvent::LeaveRoom { room_id } => self.leave_room(user_id, room_id).await,
            ClientEvent::SendMessage {
                room_id,
                content,
                kind,
                reply_to,
                attachments,
            } => {
                self.send_message(user_id, room_id, content, kind, reply_to, attachments)
                    .await
            }
            ClientEvent::TypingStart { room_id } => self.typing_start(user_id, room_id).await,
            ClientEvent::TypingStop { room_id } => self.typing_stop(user_id, room_id).await,
            ClientEvent::MarkRead {
                room_id,
                message_ids,
            } => self.mark_read(user_id, room_id, message_ids).await,
            ClientEvent::ReactToMessage {
                room_id,
                message_id,
                reaction,
            } => self.react(user_id, room_id, message_id, &reaction).await,
            ClientEvent::PinMessage {
                room_id,
                message_id,
                pin,
            } => self.pin_message(user_id, room_id, message_id, pin).await,
            ClientEvent::SearchMessages {
                room_id,
                query,
                limit,
            } => self.search(endpoint, room_id, &query, limit).await,
            ClientEvent::CreateRoom {
                kind,
                participant_ids,
                name,
                is_private,
            } => {
                self.create_room(user_id, kind, participant_ids, name, is_private)
                    .await
            }
            ClientEvent::InviteUser { room_id, user_id: target } => {
                self.invite_user(user_id, room_id, target).await
            }
            ClientEvent::RemoveUser { room_id, user_id: target } => {
                self.remove_user(user_id, room_id, target).await
            }
            ClientEvent::UpdateRoomSettings {
                room_id,
                name,
                is_private,
            } => self.update_settings(user_id, room_id, name, is_private).await,
        }
    }

    // =========================================================================
    // Room membership
    // =========================================================================

    /// Join a room's live member set (must already be a durable participant)
    pub async fn join_room(&self, user_id: UserId, room_id: RoomId) -> Result<(), DomainError> {
        self.require_participant(room_id, user_id).await?;

        if self.rooms.join(room_id, user_id) {
            self.broadcast_to_room(
                room_id,
                &ServerEvent::UserJoinedChat { room_id, user_id },
                Some(user_id),
            )
            .await;
        }
        Ok(())
    }

    /// Leave a room's live member set
    pub async fn leave_room(&self, user_id: UserId, room_id: RoomId) -> Result<(), DomainError> {
        if self.typing.stop(room_id, user_id) == StopTyping::RoomIdle {
            self.broadcast_to_room(room_id, &ServerEvent::UserStoppedTyping { room_id }, None)
                .await;
        }

        if self.rooms.leave(room_id, user_id) {
            self.broadcast_to_room(
                room_id,
                &ServerEvent::UserLeftChat { room_id, user_id },
                None,
            )
            .await;
        }
        Ok(())
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Dispatch a message to a room (see [`MessageDispatcher::dispatch`])
    pub async fn send_message(
        &self,
        user_id: UserId,
        room_id: RoomId,
        content: String,
        kind: MessageKind,
        reply_to: Option<MessageId>,
        attachments: Vec<AttachmentRef>,
    ) -> Result<(), DomainError> {
        self.dispatcher
            .dispatch(OutboundMessage {
                room_id,
                sender_id: user_id,
                content,
                kind,
                reply_to,
                attachments,
            })
            .await?;

        // Sending clears the sender's typing entry
        if self.typing.stop(room_id, user_id) == StopTyping::RoomIdle {
            self.broadcast_to_room(room_id, &ServerEvent::UserStoppedTyping { room_id }, None)
                .await;
        }
        Ok(())
    }

    /// Mark messages read and notify the room
    pub async fn mark_read(
        &self,
        user_id: UserId,
        room_id: RoomId,
        message_ids: Vec<MessageId>,
    ) -> Result<(), DomainError> {
        self.require_participant(room_id, user_id).await?;

        let updated = self
            .message_repo
            .mark_read(room_id, &message_ids, user_id)
            .await?;

        if !updated.is_empty() {
            self.broadcast_to_room(
                room_id,
                &ServerEvent::MessagesRead {
                    room_id,
                    user_id,
                    message_ids: updated,
                },
                Some(user_id),
            )
            .await;
        }
        Ok(())
    }

    /// Toggle a reaction on a message and notify the room
    pub async fn react(
        &self,
        user_id: UserId,
        room_id: RoomId,
        message_id: MessageId,
        reaction: &str,
    ) -> Result<(), DomainError> {
        self.require_participant(room_id, user_id).await?;
        if reaction.trim().is_empty() {
            return Err(DomainError::validation("reaction is empty"));
        }

        let added = self
            .message_repo
            .toggle_reaction(room_id, message_id, user_id, reaction)
            .await?;

        self.broadcast_to_room(
            room_id,
            &ServerEvent::MessageReaction {
                room_id,
                message_id,
                user_id,
                reaction: reaction.to_string(),
                added,
            },
            None,
        )
        .await;
        Ok(())
    }

    /// Pin or unpin a message (moderator or owner only)
    pub async fn pin_message(
        &self,
        user_id: UserId,
        room_id: RoomId,
        message_id: MessageId,
        pin: bool,
    ) -> Result<(), DomainError> {
        self.require_moderator(room_id, user_id).await?;

        self.message_repo.set_pinned(room_id, message_id, pin).await?;

        self.broadcast_to_room(
            room_id,
            &ServerEvent::MessagePinUpdated {
                room_id,
                message_id,
                user_id,
                pinned: pin,
            },
            None,
        )
        .await;
        Ok(())
    }

    /// Search the room's durable log; results go only to the caller
    pub async fn search(
        &self,
        endpoint: &Arc<Endpoint>,
        room_id: RoomId,
        query: &str,
        limit: usize,
    ) -> Result<(), DomainError> {
        self.require_participant(room_id, endpoint.user_id()).await?;

        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::validation("search query is empty"));
        }

        let messages = self
            .message_repo
            .search(room_id, query, limit.min(MAX_SEARCH_LIMIT))
            .await?;

        let reply = ServerEvent::SearchResults {
            room_id,
            query: query.to_string(),
            messages,
        };
        if endpoint.send(reply).await.is_err() {
            tracing::warn!(endpoint_id = %endpoint.id(), "Search reply dropped, endpoint gone");
        }
        Ok(())
    }

    // =========================================================================
    // Room administration
    // =========================================================================

    /// Create a room; the creator becomes owner
    pub async fn create_room(
        &self,
        creator: UserId,
        kind: RoomKind,
        participant_ids: Vec<UserId>,
        name: Option<String>,
        is_private: bool,
    ) -> Result<(), DomainError> {
        let others: Vec<UserId> = participant_ids
            .into_iter()
            .filter(|id| *id != creator)
            .collect();

        if kind == RoomKind::Direct && others.len() != 1 {
            return Err(DomainError::validation(
                "a direct room needs exactly one other participant",
            ));
        }

        let room = Room::new(kind, creator, others.clone())
            .with_name(name)
            .with_privacy(is_private);
        let room_id = room.id;
        self.room_repo.create(room.clone()).await?;

        // Online participants get live membership right away; offline ones
        // are hydrated at their next connect
        self.rooms.join(room_id, creator);
        self.registry
            .send_to_user(creator, &ServerEvent::ChatCreated { room: room.clone() })
            .await;

        for participant in others {
            if self.registry.is_online(participant) {
                self.rooms.join(room_id, participant);
                self.registry
                    .send_to_user(
                        participant,
                        &ServerEvent::InvitedToChat { room: room.clone() },
                    )
                    .await;
            }
        }

        tracing::info!(room_id = %room_id, creator = %creator, "Room created");
        Ok(())
    }

    /// Invite a user into a room
    pub async fn invite_user(
        &self,
        actor: UserId,
        room_id: RoomId,
        target: UserId,
    ) -> Result<(), DomainError> {
        self.require_participant(room_id, actor).await?;
        if self.room_repo.role_of(room_id, target).await?.is_some() {
            return Err(DomainError::validation("user is already a participant"));
        }

        self.room_repo
            .add_participant(room_id, target, ParticipantRole::Member)
            .await?;

        self.broadcast_to_room(
            room_id,
            &ServerEvent::UserInvited {
                room_id,
                user_id: target,
                invited_by: actor,
            },
            None,
        )
        .await;

        if self.registry.is_online(target) {
            self.rooms.join(room_id, target);
            let room = self.room_repo.get(room_id).await?;
            self.registry
                .send_to_user(target, &ServerEvent::InvitedToChat { room })
                .await;
        }
        Ok(())
    }

    /// Remove a user from a room (moderator or owner only; owners cannot
    /// be removed)
    pub async fn remove_user(
        &self,
        actor: UserId,
        room_id: RoomId,
        target: UserId,
    ) -> Result<(), DomainError> {
        self.require_moderator(room_id, actor).await?;
        if self.room_repo.role_of(room_id, target).await? == Some(ParticipantRole::Owner) {
            return Err(DomainError::validation("the room owner cannot be removed"));
        }

        self.room_repo.remove_participant(room_id, target).await?;
        self.rooms.leave(room_id, target);
        if self.typing.stop(room_id, target) == StopTyping::RoomIdle {
            self.broadcast_to_room(room_id, &ServerEvent::UserStoppedTyping { room_id }, None)
                .await;
        }

        let event = ServerEvent::UserRemoved {
            room_id,
            user_id: target,
            removed_by: actor,
        };
        self.broadcast_to_room(room_id, &event, None).await;
        // The target is out of the live member set by now; tell them directly
        self.registry.send_to_user(target, &event).await;
        Ok(())
    }

    /// Update room settings (owner only)
    pub async fn update_settings(
        &self,
        actor: UserId,
        room_id: RoomId,
        name: Option<String>,
        is_private: Option<bool>,
    ) -> Result<(), DomainError> {
        match self.room_repo.role_of(room_id, actor).await? {
            Some(ParticipantRole::Owner) => {}
            Some(_) => return Err(DomainError::MissingRole { required: "owner" }),
            None => return Err(DomainError::NotParticipant(room_id)),
        }

        self.room_repo
            .update_settings(room_id, name.clone(), is_private)
            .await?;

        self.broadcast_to_room(
            room_id,
            &ServerEvent::ChatSettingsUpdated {
                room_id,
                name,
                is_private,
                updated_by: actor,
            },
            None,
        )
        .await;
        Ok(())
    }

    // =========================================================================
    // Typing
    // =========================================================================

    /// Start typing in a room
    pub async fn typing_start(&self, user_id: UserId, room_id: RoomId) -> Result<(), DomainError> {
        if !self.rooms.is_member(room_id, user_id) {
            return Err(DomainError::NotParticipant(room_id));
        }

        if self.typing.start(room_id, user_id) {
            self.broadcast_to_room(
                room_id,
                &ServerEvent::UserTyping { room_id, user_id },
                Some(user_id),
            )
            .await;
        }
        Ok(())
    }

    /// Stop typing in a room
    pub async fn typing_stop(&self, user_id: UserId, room_id: RoomId) -> Result<(), DomainError> {
        if self.typing.stop(room_id, user_id) == StopTyping::RoomIdle {
            self.broadcast_to_room(room_id, &ServerEvent::UserStoppedTyping { room_id }, None)
                .await;
        }
        Ok(())
    }

    // =========================================================================
    // Maintenance (reconciler entry points)
    // =========================================================================

    /// One reconciliation pass: unregister endpoints whose transport has
    /// silently died. Returns how many were removed.
    pub async fn reconcile_once(&self) -> usize {
        let window = self.config.liveness_window();
        let mut removed = 0;

        for endpoint in self.registry.all_endpoints() {
            if endpoint.is_closed() || endpoint.idle_for() > window {
                tracing::info!(
                    endpoint_id = %endpoint.id(),
                    user_id = %endpoint.user_id(),
                    closed = endpoint.is_closed(),
                    "Reconciler removing dead endpoint"
                );
                self.disconnect(endpoint.id()).await;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed = removed, "Reconciliation pass complete");
        }
        removed
    }

    /// Expire stale typing entries whose stop event was lost
    pub async fn expire_typing(&self) -> usize {
        let idle_rooms = self.typing.expire_stale(self.config.typing_ttl());
        let count = idle_rooms.len();
        for room_id in idle_rooms {
            self.broadcast_to_room(room_id, &ServerEvent::UserStoppedTyping { room_id }, None)
                .await;
        }
        count
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    async fn require_participant(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<ParticipantRole, DomainError> {
        self.room_repo
            .role_of(room_id, user_id)
            .await?
            .ok_or(DomainError::NotParticipant(room_id))
    }

    async fn require_moderator(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<ParticipantRole, DomainError> {
        let role = self.require_participant(room_id, user_id).await?;
        if role.can_moderate() {
            Ok(role)
        } else {
            Err(DomainError::MissingRole {
                required: "moderator",
            })
        }
    }

    /// Send an event to every live member of a room, optionally excluding
    /// one user (typically the originator)
    async fn broadcast_to_room(
        &self,
        room_id: RoomId,
        event: &ServerEvent,
        exclude: Option<UserId>,
    ) {
        for member in self.rooms.members_of(room_id) {
            if Some(member) == exclude {
                continue;
            }
            self.registry.send_to_user(member, event).await;
        }
    }
}

impl std::fmt::Debug for RealtimeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeService")
            .field("registry", &self.registry)
            .field("rooms", &self.rooms.room_count())
            .finish()
    }
}
