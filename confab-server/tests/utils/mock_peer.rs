use async_trait::async_trait;
use confab_core::{IceCandidate, SessionId, TrackId};
use confab_server::{
    ForwardingTrack, PeerFactory, PeerSession, RemoteTrack, SessionEvent, TransportError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum PeerCall {
    RemoteOffer(String),
    RemoteAnswer(String),
    Candidate(String),
    AddTrack(TrackId),
    RemoveTrack(TrackId),
    Close,
}

/// What a mock peer has been asked to do, plus a way to poke its session.
pub struct MockPeerState {
    pub session: SessionId,
    events: mpsc::UnboundedSender<SessionEvent>,
    calls: Mutex<Vec<PeerCall>>,
    offers_created: AtomicU32,
    failing_adds: AtomicU32,
}

impl MockPeerState {
    pub fn calls(&self) -> Vec<PeerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Tracks currently being sent to this client.
    pub fn forwarded(&self) -> Vec<TrackId> {
        let mut tracks = Vec::new();
        for call in self.calls() {
            match call {
                PeerCall::AddTrack(id) => tracks.push(id),
                PeerCall::RemoveTrack(id) => tracks.retain(|t| *t != id),
                _ => {}
            }
        }
        tracks
    }

    pub fn is_closed(&self) -> bool {
        self.calls().contains(&PeerCall::Close)
    }

    /// Pretend the client started sending `track`.
    pub fn emit_track(&self, track: RemoteTrack) {
        let _ = self.events.send(SessionEvent::RemoteTrack(track));
    }

    /// Pretend the peer connection failed.
    pub fn emit_connection_lost(&self) {
        let _ = self.events.send(SessionEvent::ConnectionLost);
    }

    fn log(&self, call: PeerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

struct MockPeer(Arc<MockPeerState>);

#[async_trait]
impl PeerSession for MockPeer {
    async fn set_remote_offer(&self, sdp: String) -> Result<(), TransportError> {
        if sdp.is_empty() {
            return Err(TransportError::InvalidCandidate("empty sdp".to_owned()));
        }
        self.0.log(PeerCall::RemoteOffer(sdp));
        Ok(())
    }

    async fn set_remote_answer(&self, sdp: String) -> Result<(), TransportError> {
        self.0.log(PeerCall::RemoteAnswer(sdp));
        Ok(())
    }

    async fn create_answer(&self) -> Result<String, TransportError> {
        Ok(format!("answer-for-{}", self.0.session))
    }

    async fn create_offer(&self) -> Result<String, TransportError> {
        let n = self.0.offers_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("offer-{}-{}", self.0.session, n))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        self.0.log(PeerCall::Candidate(candidate.candidate));
        Ok(())
    }

    async fn add_forwarding_track(&self, track: Arc<ForwardingTrack>) -> Result<(), TransportError> {
        let failing = self
            .0
            .failing_adds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::UnknownTrack(track.id()));
        }
        self.0.log(PeerCall::AddTrack(track.id()));
        let _ = self.0.events.send(SessionEvent::NegotiationNeeded);
        Ok(())
    }

    async fn remove_forwarding_track(&self, track_id: TrackId) -> Result<(), TransportError> {
        self.0.log(PeerCall::RemoveTrack(track_id));
        let _ = self.0.events.send(SessionEvent::NegotiationNeeded);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.0.log(PeerCall::Close);
        Ok(())
    }
}

/// Peer factory handing out scriptable in-memory peers.
#[derive(Clone, Default)]
pub struct MockPeerFactory {
    peers: Arc<Mutex<HashMap<SessionId, Arc<MockPeerState>>>>,
    failing_adds: Arc<AtomicU32>,
}

impl MockPeerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peer(&self, session: SessionId) -> Option<Arc<MockPeerState>> {
        self.peers.lock().unwrap().get(&session).cloned()
    }

    pub fn created(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    /// Make the first `n` track additions of the next peer fail.
    pub fn fail_next_adds(&self, n: u32) {
        self.failing_adds.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl PeerFactory for MockPeerFactory {
    async fn create(
        &self,
        session: SessionId,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Box<dyn PeerSession>, TransportError> {
        let state = Arc::new(MockPeerState {
            session,
            events,
            calls: Mutex::new(Vec::new()),
            offers_created: AtomicU32::new(0),
            failing_adds: AtomicU32::new(self.failing_adds.swap(0, Ordering::SeqCst)),
        });
        self.peers.lock().unwrap().insert(session, Arc::clone(&state));
        Ok(Box::new(MockPeer(state)))
    }
}
