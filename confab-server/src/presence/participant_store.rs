use crate::error::StoreError;
use async_trait::async_trait;
use confab_core::{Participant, RoomKey};
use dashmap::DashMap;
use indexmap::IndexMap;

/// Where participant lists live. Keyed per room, last write wins per participant id.
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    async fn add(&self, room: &RoomKey, participant: Participant) -> Result<(), StoreError>;

    async fn remove(&self, room: &RoomKey, participant_id: &str) -> Result<(), StoreError>;

    /// Participants in insertion order.
    async fn list(&self, room: &RoomKey) -> Result<Vec<Participant>, StoreError>;
}

#[derive(Default)]
pub struct MemoryParticipantStore {
    rooms: DashMap<RoomKey, IndexMap<String, Participant>>,
}

impl MemoryParticipantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[async_trait]
impl ParticipantStore for MemoryParticipantStore {
    async fn add(&self, room: &RoomKey, participant: Participant) -> Result<(), StoreError> {
        // IndexMap::insert keeps the original slot of an existing id.
        self.rooms
            .entry(room.clone())
            .or_default()
            .insert(participant.id.clone(), participant);
        Ok(())
    }

    async fn remove(&self, room: &RoomKey, participant_id: &str) -> Result<(), StoreError> {
        if let Some(mut participants) = self.rooms.get_mut(room) {
            participants.shift_remove(participant_id);
        }
        self.rooms.remove_if(room, |_, participants| participants.is_empty());
        Ok(())
    }

    async fn list(&self, room: &RoomKey) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .rooms
            .get(room)
            .map(|participants| participants.values().cloned().collect())
            .unwrap_or_default())
    }
}
