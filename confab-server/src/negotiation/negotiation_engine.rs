use crate::error::NegotiationError;
use crate::negotiation::NegotiationState;
use crate::sfu::ForwardingTrack;
use crate::signaling::SignalingOutput;
use crate::transport::{PeerFactory, PeerSession, SessionConfig, SessionEvent};
use confab_core::{IceCandidate, SessionId, TrackId};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Offer/answer state machine for one client.
///
/// The client opens with an offer. Afterwards the server may re-offer
/// whenever its peer connection needs renegotiation; at most one server
/// offer is outstanding and further requests are coalesced into one
/// follow-up round.
pub struct NegotiationEngine {
    session: SessionId,
    state: watch::Sender<NegotiationState>,
    peer: Option<Box<dyn PeerSession>>,
    peers: Arc<dyn PeerFactory>,
    signaling: Arc<dyn SignalingOutput>,
    events: mpsc::UnboundedSender<SessionEvent>,
    pending_candidates: Vec<IceCandidate>,
    pending_tracks: Vec<Arc<ForwardingTrack>>,
    attached: HashSet<TrackId>,
    renegotiation_pending: bool,
    abandoned_offer: bool,
    offer_deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl NegotiationEngine {
    pub fn new(
        session: SessionId,
        peers: Arc<dyn PeerFactory>,
        signaling: Arc<dyn SignalingOutput>,
        events: mpsc::UnboundedSender<SessionEvent>,
        config: &SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(NegotiationState::Idle);
        Self {
            session,
            state,
            peer: None,
            peers,
            signaling,
            events,
            pending_candidates: Vec::new(),
            pending_tracks: Vec::new(),
            attached: HashSet::new(),
            renegotiation_pending: false,
            abandoned_offer: false,
            offer_deadline: None,
            timeout: config.negotiation_timeout,
        }
    }

    pub fn state(&self) -> NegotiationState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NegotiationState> {
        self.state.subscribe()
    }

    /// When the outstanding server offer expires, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.offer_deadline
    }

    pub fn is_attached(&self, track_id: TrackId) -> bool {
        self.attached.contains(&track_id)
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    fn set_state(&self, next: NegotiationState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!("Session {} negotiation: {} -> {}", self.session, prev, next);
        }
    }

    fn unexpected(&self, message: &'static str) -> NegotiationError {
        NegotiationError::UnexpectedMessage {
            message,
            state: self.state().as_str(),
        }
    }

    fn peer(&self) -> Result<&dyn PeerSession, NegotiationError> {
        self.peer.as_deref().ok_or(NegotiationError::NoPeerSession)
    }

    pub async fn handle_offer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        match self.state() {
            NegotiationState::Closed => return Err(NegotiationError::Closed),
            // Our own offer is outstanding; the client must answer it first.
            NegotiationState::Renegotiating => return Err(self.unexpected("offer")),
            NegotiationState::Idle => return self.accept_first_offer(sdp).await,
            NegotiationState::HasOffer | NegotiationState::Stable => {}
        }

        let peer = self.peer()?;
        peer.set_remote_offer(sdp).await?;
        let answer = peer.create_answer().await?;
        self.signaling.send_answer(answer).await;
        self.set_state(NegotiationState::Stable);
        self.resume_pending().await
    }

    async fn accept_first_offer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        let peer = self.peers.create(self.session, self.events.clone()).await?;
        self.set_state(NegotiationState::HasOffer);

        let answer = match Self::answer(peer.as_ref(), sdp, &mut self.pending_candidates).await {
            Ok(answer) => answer,
            Err(e) => {
                if let Err(close_err) = peer.close().await {
                    debug!("Closing rejected peer for {}: {}", self.session, close_err);
                }
                self.set_state(NegotiationState::Idle);
                return Err(e);
            }
        };

        self.peer = Some(peer);
        self.signaling.send_answer(answer).await;
        self.set_state(NegotiationState::Stable);
        info!("Session {} negotiated", self.session);

        for track in std::mem::take(&mut self.pending_tracks) {
            let track_id = track.id();
            if let Err(e) = self.add_to_peer(track).await {
                warn!(
                    "Session {} dropped queued track {}: {}",
                    self.session, track_id, e
                );
            }
        }
        self.resume_pending().await
    }

    async fn answer(
        peer: &dyn PeerSession,
        sdp: String,
        pending_candidates: &mut Vec<IceCandidate>,
    ) -> Result<String, NegotiationError> {
        peer.set_remote_offer(sdp).await?;
        for candidate in pending_candidates.drain(..) {
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!("Dropping queued ICE candidate: {}", e);
            }
        }
        Ok(peer.create_answer().await?)
    }

    pub async fn handle_answer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        match self.state() {
            NegotiationState::Renegotiating => {
                self.peer()?.set_remote_answer(sdp).await?;
                self.offer_deadline = None;
                self.set_state(NegotiationState::Stable);
                self.resume_pending().await
            }
            NegotiationState::Stable if self.abandoned_offer => {
                self.abandoned_offer = false;
                self.peer()?.set_remote_answer(sdp).await?;
                debug!("Session {} applied a late answer", self.session);
                Ok(())
            }
            NegotiationState::Closed => Err(NegotiationError::Closed),
            _ => Err(self.unexpected("answer")),
        }
    }

    pub async fn handle_candidate(&mut self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        match self.state() {
            NegotiationState::Closed => Err(NegotiationError::Closed),
            NegotiationState::Idle => {
                self.pending_candidates.push(candidate);
                Ok(())
            }
            _ => Ok(self.peer()?.add_ice_candidate(candidate).await?),
        }
    }

    /// The peer connection asked for a new offer.
    pub async fn on_negotiation_needed(&mut self) -> Result<(), NegotiationError> {
        match self.state() {
            NegotiationState::Stable => self.start_renegotiation().await,
            NegotiationState::Closed => Ok(()),
            _ => {
                self.renegotiation_pending = true;
                Ok(())
            }
        }
    }

    async fn start_renegotiation(&mut self) -> Result<(), NegotiationError> {
        self.renegotiation_pending = false;
        let offer = self.peer()?.create_offer().await?;
        self.signaling.send_offer(offer).await;
        self.abandoned_offer = false;
        self.offer_deadline = self.timeout.map(|t| Instant::now() + t);
        self.set_state(NegotiationState::Renegotiating);
        Ok(())
    }

    async fn resume_pending(&mut self) -> Result<(), NegotiationError> {
        if self.renegotiation_pending && self.state() == NegotiationState::Stable {
            self.start_renegotiation().await
        } else {
            Ok(())
        }
    }

    /// Give up on an unanswered server offer once its deadline has passed.
    pub async fn on_deadline(&mut self) -> Result<(), NegotiationError> {
        let expired = self
            .offer_deadline
            .is_some_and(|deadline| Instant::now() >= deadline);
        if self.state() != NegotiationState::Renegotiating || !expired {
            return Ok(());
        }
        warn!(
            "Session {} did not answer the server offer in time; abandoning it",
            self.session
        );
        self.offer_deadline = None;
        self.abandoned_offer = true;
        self.set_state(NegotiationState::Stable);
        self.resume_pending().await
    }

    /// Start sending a sibling's track to this client.
    ///
    /// Returns `false` when the track is already attached or is the client's own.
    /// Before the first answer there is no peer yet, so the track is queued
    /// and added right after the answer goes out. `AudioSession` only joins
    /// its room after that answer, so relay traffic never takes this path;
    /// callers driving the engine directly may.
    pub async fn attach_track(&mut self, track: Arc<ForwardingTrack>) -> Result<bool, NegotiationError> {
        if track.origin() == self.session || self.attached.contains(&track.id()) {
            return Ok(false);
        }
        match self.state() {
            NegotiationState::Closed => Err(NegotiationError::Closed),
            NegotiationState::Idle | NegotiationState::HasOffer => {
                self.attached.insert(track.id());
                self.pending_tracks.push(track);
                Ok(true)
            }
            NegotiationState::Stable | NegotiationState::Renegotiating => {
                self.add_to_peer(track).await?;
                Ok(true)
            }
        }
    }

    async fn add_to_peer(&mut self, track: Arc<ForwardingTrack>) -> Result<(), NegotiationError> {
        let id = track.id();
        let peer = self.peer()?;
        if let Err(e) = peer.add_forwarding_track(track).await {
            self.attached.remove(&id);
            return Err(e.into());
        }
        self.attached.insert(id);
        Ok(())
    }

    /// Stop sending a track. Returns `false` if it was never attached.
    pub async fn detach_track(&mut self, track_id: TrackId) -> Result<bool, NegotiationError> {
        if !self.attached.remove(&track_id) {
            return Ok(false);
        }
        let queued = self.pending_tracks.len();
        self.pending_tracks.retain(|t| t.id() != track_id);
        if self.pending_tracks.len() != queued {
            return Ok(true);
        }
        self.peer()?.remove_forwarding_track(track_id).await?;
        Ok(true)
    }

    pub async fn close(&mut self) {
        if self.state() == NegotiationState::Closed {
            return;
        }
        if let Some(peer) = self.peer.take() {
            if let Err(e) = peer.close().await {
                debug!("Closing peer for {}: {}", self.session, e);
            }
        }
        self.pending_candidates.clear();
        self.pending_tracks.clear();
        self.attached.clear();
        self.offer_deadline = None;
        self.set_state(NegotiationState::Closed);
    }
}
