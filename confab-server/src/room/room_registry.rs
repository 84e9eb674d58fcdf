use confab_core::SessionId;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outbound half of one connection, as seen by the rooms it is in.
pub struct Member<T> {
    pub id: SessionId,
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Member<T> {
    pub fn new(id: SessionId, tx: mpsc::UnboundedSender<T>) -> Self {
        Self { id, tx }
    }

    /// Queue a message for the connection's writer. `false` once the writer is gone.
    pub fn send(&self, msg: T) -> bool {
        self.tx.send(msg).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for Member<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
        }
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member").field("id", &self.id).finish()
    }
}

/// Room key → member sessions.
///
/// A key is present iff its room has at least one member. Every room lives in
/// one dashmap shard, so join/leave on the same key are serialized by the
/// shard lock while unrelated rooms proceed in parallel.
pub struct RoomRegistry<K, T> {
    rooms: Arc<DashMap<K, HashMap<SessionId, Member<T>>>>,
}

impl<K, T> Clone for RoomRegistry<K, T> {
    fn clone(&self) -> Self {
        Self {
            rooms: self.rooms.clone(),
        }
    }
}

impl<K, T> Default for RoomRegistry<K, T>
where
    K: Eq + Hash + Clone + fmt::Display,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> RoomRegistry<K, T>
where
    K: Eq + Hash + Clone + fmt::Display,
    T: Clone,
{
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
        }
    }

    /// Add `member` to `key`, creating the room on first member.
    /// Returns `true` when the room was created by this call.
    pub fn join(&self, key: K, member: Member<T>) -> bool {
        let mut created = false;
        let session = member.id;
        self.rooms
            .entry(key.clone())
            .or_insert_with(|| {
                created = true;
                HashMap::new()
            })
            .insert(session, member);

        if created {
            info!("Room {} created", key);
        }
        debug!("Session {} joined room {}", session, key);
        created
    }

    /// Remove `session` from `key`. Returns `true` when the room was deleted.
    pub fn leave(&self, key: &K, session: SessionId) -> bool {
        {
            let Some(mut members) = self.rooms.get_mut(key) else {
                return false;
            };
            if members.remove(&session).is_some() {
                debug!("Session {} left room {}", session, key);
            }
        }

        // Re-checked under the shard lock: a concurrent join keeps the room alive.
        let deleted = self
            .rooms
            .remove_if(key, |_, members| members.is_empty())
            .is_some();
        if deleted {
            info!("Room {} is empty, removed", key);
        }
        deleted
    }

    /// Remove `session` from every room. Returns the keys it was in.
    pub fn leave_all(&self, session: SessionId) -> Vec<K> {
        let keys: Vec<K> = self
            .rooms
            .iter()
            .filter(|entry| entry.value().contains_key(&session))
            .map(|entry| entry.key().clone())
            .collect();

        for key in &keys {
            self.leave(key, session);
        }
        keys
    }

    /// Snapshot of the room's members; empty when the room does not exist.
    pub fn members(&self, key: &K) -> Vec<Member<T>> {
        self.rooms
            .get(key)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn member_ids(&self, key: &K) -> Vec<SessionId> {
        self.rooms
            .get(key)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, key: &K, session: SessionId) -> bool {
        self.rooms
            .get(key)
            .is_some_and(|members| members.contains_key(&session))
    }

    pub fn contains_room(&self, key: &K) -> bool {
        self.rooms.contains_key(key)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Deliver `msg` to every member except `excluding`.
    ///
    /// Works on a snapshot so no shard lock is held while sending. Members
    /// whose writer has gone away are dropped from the room. Returns the
    /// number of successful deliveries.
    pub fn broadcast(&self, key: &K, msg: T, excluding: Option<SessionId>) -> usize {
        let mut delivered = 0;
        let mut stale = Vec::new();

        for member in self.members(key) {
            if Some(member.id) == excluding {
                continue;
            }
            if member.send(msg.clone()) {
                delivered += 1;
            } else {
                stale.push(member.id);
            }
        }

        for session in stale {
            warn!(
                "Dropping session {} from room {}: connection is closed",
                session, key
            );
            self.leave(key, session);
        }
        delivered
    }

    /// Deliver `msg` to one member of the room.
    pub fn send_to(&self, key: &K, session: SessionId, msg: T) -> bool {
        let member = self
            .rooms
            .get(key)
            .and_then(|members| members.get(&session).cloned());
        match member {
            Some(member) => member.send(msg),
            None => false,
        }
    }
}
