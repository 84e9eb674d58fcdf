use crate::room::{Member, RoomRegistry};
use crate::sfu::{ForwardExit, ForwardingTrack, forward_rtp};
use crate::transport::{RemoteTrack, SessionEvent};
use confab_core::{SessionId, TeamId, TrackId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type PublishedTracks = HashMap<SessionId, Vec<Arc<ForwardingTrack>>>;

/// Audio fan-out between the sessions of each team.
///
/// Members get `Forward`/`Unforward` events on their session queue. A
/// publisher registers its track before snapshotting members, and a joiner
/// joins before snapshotting tracks, so every (publisher, member) pair
/// learns about each track at least once. Sessions drop duplicates by
/// track id.
#[derive(Clone, Default)]
pub struct SfuRelay {
    members: RoomRegistry<TeamId, SessionEvent>,
    tracks: Arc<DashMap<TeamId, PublishedTracks>>,
}

impl SfuRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(&self) -> &RoomRegistry<TeamId, SessionEvent> {
        &self.members
    }

    /// Join `team` and return the tracks already published there by others.
    pub fn join(&self, team: &TeamId, member: Member<SessionEvent>) -> Vec<Arc<ForwardingTrack>> {
        let session = member.id;
        if self.members.join(team.clone(), member) {
            info!("Audio room {} opened", team);
        }
        let existing = self.published_tracks(team, Some(session));
        debug!(
            "Session {} joined audio room {} with {} existing tracks",
            session,
            team,
            existing.len()
        );
        existing
    }

    pub fn published_tracks(
        &self,
        team: &TeamId,
        excluding: Option<SessionId>,
    ) -> Vec<Arc<ForwardingTrack>> {
        self.tracks
            .get(team)
            .map(|by_session| {
                by_session
                    .iter()
                    .filter(|(session, _)| Some(**session) != excluding)
                    .flat_map(|(_, tracks)| tracks.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn track_count(&self, team: &TeamId) -> usize {
        self.tracks
            .get(team)
            .map(|by_session| by_session.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Mirror `remote` into the room and start copying its packets.
    ///
    /// The forwarding loop stops when `cancel` fires or the source ends, and
    /// retires the track from the room on its way out.
    pub fn publish(
        &self,
        team: &TeamId,
        origin: SessionId,
        remote: RemoteTrack,
        cancel: CancellationToken,
    ) -> Arc<ForwardingTrack> {
        let track = Arc::new(ForwardingTrack::mirror(origin, &remote));

        self.tracks
            .entry(team.clone())
            .or_default()
            .entry(origin)
            .or_default()
            .push(Arc::clone(&track));

        let delivered =
            self.members
                .broadcast(team, SessionEvent::Forward(Arc::clone(&track)), Some(origin));
        info!(
            "Session {} published track {} ({:?}) in {}; forwarding to {} peers",
            origin, track.id(), remote, team, delivered
        );

        let relay = self.clone();
        let team = team.clone();
        let forwarded = Arc::clone(&track);
        tokio::spawn(async move {
            let exit = forward_rtp(remote.source, Arc::clone(&forwarded), cancel).await;
            if exit != ForwardExit::Cancelled {
                relay.retire(&team, origin, forwarded.id());
            }
        });

        track
    }

    /// Drop one published track and tell the room it is gone.
    pub fn retire(&self, team: &TeamId, origin: SessionId, track_id: TrackId) -> bool {
        let removed = match self.tracks.get_mut(team) {
            Some(mut by_session) => {
                let removed = by_session
                    .get_mut(&origin)
                    .map(|tracks| {
                        let before = tracks.len();
                        tracks.retain(|t| t.id() != track_id);
                        tracks.len() != before
                    })
                    .unwrap_or(false);
                by_session.retain(|_, tracks| !tracks.is_empty());
                removed
            }
            None => false,
        };
        self.tracks.remove_if(team, |_, by_session| by_session.is_empty());

        if removed {
            let notified = self
                .members
                .broadcast(team, SessionEvent::Unforward(track_id), Some(origin));
            info!(
                "Track {} from {} retired in {}; {} peers notified",
                track_id, origin, team, notified
            );
        }
        removed
    }

    /// Remove `session` from `team` along with every track it published.
    pub fn leave(&self, team: &TeamId, session: SessionId) -> Vec<TrackId> {
        if self.members.leave(team, session) {
            info!("Audio room {} closed", team);
        }

        let retired: Vec<TrackId> = self
            .tracks
            .get_mut(team)
            .and_then(|mut by_session| by_session.remove(&session))
            .map(|tracks| tracks.iter().map(|t| t.id()).collect())
            .unwrap_or_default();
        self.tracks.remove_if(team, |_, by_session| by_session.is_empty());

        for track_id in &retired {
            self.members
                .broadcast(team, SessionEvent::Unforward(*track_id), Some(session));
        }
        debug!(
            "Session {} left audio room {}; retired {} tracks",
            session,
            team,
            retired.len()
        );
        retired
    }
}
