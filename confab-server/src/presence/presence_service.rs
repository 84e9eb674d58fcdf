use crate::error::StoreError;
use crate::presence::ParticipantStore;
use crate::room::{Member, RoomRegistry};
use crate::signaling::text_frame;
use axum::extract::ws::Message;
use confab_core::{Participant, PresenceResponse, RoomKey, SessionId};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Participant lists per `(team, kind)` room, pushed in full to every
/// connection in the room after each change.
#[derive(Clone)]
pub struct PresenceService {
    store: Arc<dyn ParticipantStore>,
    rooms: RoomRegistry<RoomKey, Message>,
}

impl PresenceService {
    pub fn new(store: Arc<dyn ParticipantStore>) -> Self {
        Self {
            store,
            rooms: RoomRegistry::new(),
        }
    }

    pub fn rooms(&self) -> &RoomRegistry<RoomKey, Message> {
        &self.rooms
    }

    /// Subscribe a connection to the room's updates.
    pub fn attach(&self, room: RoomKey, member: Member<Message>) {
        self.rooms.join(room, member);
    }

    pub fn detach(&self, room: &RoomKey, session: SessionId) {
        self.rooms.leave(room, session);
    }

    pub fn detach_all(&self, session: SessionId) -> Vec<RoomKey> {
        self.rooms.leave_all(session)
    }

    pub async fn add_participant(
        &self,
        room: &RoomKey,
        participant: Participant,
    ) -> Result<(), StoreError> {
        let participant_id = participant.id.clone();
        self.store.add(room, participant).await?;
        info!("Participant {} added to {}", participant_id, room);
        self.broadcast_participants(room).await;
        Ok(())
    }

    /// Removing an id that is not present is not an error; the room is still refreshed.
    pub async fn remove_participant(
        &self,
        room: &RoomKey,
        participant_id: &str,
    ) -> Result<(), StoreError> {
        self.store.remove(room, participant_id).await?;
        info!("Participant {} removed from {}", participant_id, room);
        self.broadcast_participants(room).await;
        Ok(())
    }

    pub async fn list(&self, room: &RoomKey) -> Result<Vec<Participant>, StoreError> {
        self.store.list(room).await
    }

    /// Push the full participant list to every attached connection.
    /// Returns how many connections received it.
    pub async fn broadcast_participants(&self, room: &RoomKey) -> usize {
        let participants = match self.store.list(room).await {
            Ok(participants) => participants,
            Err(e) => {
                error!("Failed to list participants of {}: {}", room, e);
                return 0;
            }
        };

        let count = participants.len();
        let frame = match text_frame(&PresenceResponse::UpdateParticipants { participants }) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode participant update: {}", e);
                return 0;
            }
        };

        let delivered = self.rooms.broadcast(room, frame, None);
        debug!(
            "Broadcast {} participants of {} to {} connections",
            count, room, delivered
        );
        delivered
    }
}
