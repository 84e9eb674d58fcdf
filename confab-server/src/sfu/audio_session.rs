use crate::negotiation::{NegotiationEngine, NegotiationState};
use crate::room::Member;
use crate::sfu::SfuRelay;
use crate::signaling::SignalingOutput;
use crate::transport::{PeerFactory, SessionConfig, SessionEvent};
use confab_core::{SessionId, SignalMessage, TeamId};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Room used when a client's first offer names no team.
pub const DEFAULT_AUDIO_ROOM: &str = "lobby";

/// Handle to a running [`AudioSession`] task.
pub struct AudioSessionHandle {
    pub id: SessionId,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: watch::Receiver<NegotiationState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl AudioSessionHandle {
    /// Queue an event for the session. `false` once it has shut down.
    pub fn dispatch(&self, event: SessionEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn signal(&self, msg: SignalMessage) -> bool {
        self.dispatch(SessionEvent::Signal(msg))
    }

    pub fn state(&self) -> watch::Receiver<NegotiationState> {
        self.state.clone()
    }

    /// Fires once the session has started tearing down.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Wait for teardown to finish.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!("Audio session {} task failed: {}", self.id, e);
        }
    }
}

/// One client's audio connection: negotiation plus room membership.
///
/// Every input is serialized through the session's event queue, so the
/// engine is only ever touched by this task.
pub struct AudioSession {
    id: SessionId,
    /// Set once the first offer is answered and the room joined.
    team: Option<TeamId>,
    engine: NegotiationEngine,
    relay: SfuRelay,
    signaling: Arc<dyn SignalingOutput>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    cancel: CancellationToken,
}

impl AudioSession {
    pub fn spawn(
        id: SessionId,
        relay: SfuRelay,
        peers: Arc<dyn PeerFactory>,
        signaling: Arc<dyn SignalingOutput>,
        config: &SessionConfig,
    ) -> AudioSessionHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let engine = NegotiationEngine::new(
            id,
            peers,
            Arc::clone(&signaling),
            events_tx.clone(),
            config,
        );
        let state = engine.subscribe();
        let cancel = CancellationToken::new();

        let session = Self {
            id,
            team: None,
            engine,
            relay,
            signaling,
            events_tx: events_tx.clone(),
            events_rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(session.run());

        AudioSessionHandle {
            id,
            events: events_tx,
            state,
            cancel,
            task,
        }
    }

    async fn run(mut self) {
        info!("Audio session {} started", self.id);
        loop {
            let deadline = self.engine.deadline();
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = self.events_rx.recv() => {
                    let Some(event) = event else { break };
                    if self.handle_event(event).await.is_break() {
                        break;
                    }
                }
                _ = wait_until(deadline) => {
                    if let Err(e) = self.engine.on_deadline().await {
                        warn!("Session {} re-offer after timeout failed: {}", self.id, e);
                    }
                }
            }
        }
        self.teardown().await;
    }

    async fn handle_event(&mut self, event: SessionEvent) -> ControlFlow<()> {
        let name = event.name();
        let result = match event {
            SessionEvent::Signal(SignalMessage::Offer { sdp, team_id }) => {
                self.on_offer(sdp, team_id).await
            }
            SessionEvent::Signal(SignalMessage::Answer { sdp, .. }) => {
                self.engine.handle_answer(sdp).await
            }
            SessionEvent::Signal(SignalMessage::IceCandidate { candidate, .. }) => {
                self.engine.handle_candidate(candidate).await
            }
            SessionEvent::NegotiationNeeded => self.engine.on_negotiation_needed().await,
            SessionEvent::RemoteTrack(remote) => {
                match &self.team {
                    Some(team) => {
                        self.relay
                            .publish(team, self.id, remote, self.cancel.child_token());
                    }
                    _ => warn!(
                        "Session {} got track {:?} before joining a room",
                        self.id, remote
                    ),
                }
                Ok(())
            }
            SessionEvent::LocalCandidate(candidate) => {
                self.signaling.send_ice(candidate).await;
                Ok(())
            }
            SessionEvent::ConnectionLost => {
                info!("Peer connection for session {} lost", self.id);
                return ControlFlow::Break(());
            }
            SessionEvent::Forward(track) => self.engine.attach_track(track).await.map(|_| ()),
            SessionEvent::Unforward(track_id) => {
                self.engine.detach_track(track_id).await.map(|_| ())
            }
        };

        if let Err(e) = result {
            warn!("Session {} dropped {}: {}", self.id, name, e);
        }
        if self.engine.state() == NegotiationState::Closed {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    async fn on_offer(
        &mut self,
        sdp: String,
        team_id: Option<String>,
    ) -> Result<(), crate::error::NegotiationError> {
        // The room is only fixed once the first offer has been answered.
        let team = match &self.team {
            Some(team) => team.clone(),
            None => TeamId::new(team_id.clone().unwrap_or_else(|| DEFAULT_AUDIO_ROOM.to_owned())),
        };
        if let Some(requested) = team_id.filter(|t| t.as_str() != team.as_str()) {
            debug!(
                "Session {} stays in {} despite offer for {}",
                self.id, team, requested
            );
        }

        self.engine.handle_offer(sdp).await?;

        if self.team.is_none() {
            self.team = Some(team.clone());
            let member = Member::new(self.id, self.events_tx.clone());
            for track in self.relay.join(&team, member) {
                let track_id = track.id();
                if let Err(e) = self.engine.attach_track(track).await {
                    warn!(
                        "Session {} will not receive track {}: {}",
                        self.id, track_id, e
                    );
                }
            }
        }
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(team) = &self.team {
            self.relay.leave(team, self.id);
        }
        self.cancel.cancel();
        self.engine.close().await;
        info!("Audio session {} closed", self.id);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
