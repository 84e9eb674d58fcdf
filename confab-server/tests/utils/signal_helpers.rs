use anyhow::{Context, Result};
use confab_core::{SessionId, SignalMessage};
use confab_server::{
    AudioSession, AudioSessionHandle, NegotiationState, SessionConfig, SfuRelay,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::mock_peer::{MockPeerFactory, MockPeerState};
use super::mock_signaling::{MockSignalingOutput, Outbound};

/// Timeout for signal exchange operations (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 2000;

/// An audio session wired to mocks, as a test drives it.
pub struct TestSession {
    pub handle: AudioSessionHandle,
    pub signaling: MockSignalingOutput,
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
}

impl TestSession {
    pub fn spawn(relay: &SfuRelay, factory: &MockPeerFactory, config: &SessionConfig) -> Self {
        let (signaling, outbound) = MockSignalingOutput::new();
        let handle = AudioSession::spawn(
            SessionId::new(),
            relay.clone(),
            Arc::new(factory.clone()),
            Arc::new(signaling.clone()),
            config,
        );
        Self {
            handle,
            signaling,
            outbound,
        }
    }

    pub fn id(&self) -> SessionId {
        self.handle.id
    }

    pub fn send(&self, msg: SignalMessage) {
        assert!(self.handle.signal(msg), "session stopped early");
    }

    /// Send the client's opening offer for `team` and wait for the answer.
    pub async fn join(&mut self, team: &str) -> Result<String> {
        self.send(SignalMessage::Offer {
            sdp: format!("client-offer-{}", self.id()),
            team_id: Some(team.to_owned()),
        });
        self.wait_for_answer().await
    }

    pub async fn wait_for_answer(&mut self) -> Result<String> {
        loop {
            match self.next_outbound().await? {
                Outbound::Answer(sdp) => return Ok(sdp),
                _ => continue,
            }
        }
    }

    pub async fn wait_for_offer(&mut self) -> Result<String> {
        loop {
            match self.next_outbound().await? {
                Outbound::Offer(sdp) => return Ok(sdp),
                _ => continue,
            }
        }
    }

    async fn next_outbound(&mut self) -> Result<Outbound> {
        tokio::time::timeout(
            Duration::from_millis(SIGNAL_TIMEOUT_MS),
            self.outbound.recv(),
        )
        .await
        .context("timed out waiting for the server")?
        .context("signal channel closed")
    }

    /// Answer the server's outstanding re-offer.
    pub fn answer(&self) {
        self.send(SignalMessage::answer(format!("client-answer-{}", self.id())));
    }

    pub async fn wait_for_state(&self, target: NegotiationState) -> Result<()> {
        let mut state = self.handle.state();
        tokio::time::timeout(
            Duration::from_millis(SIGNAL_TIMEOUT_MS),
            state.wait_for(|s| *s == target),
        )
        .await
        .with_context(|| format!("timed out waiting for {target}"))?
        .context("session state channel closed")?;
        Ok(())
    }
}

/// Poll `check` until it holds or the signal timeout passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(SIGNAL_TIMEOUT_MS);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

pub fn peer_of(factory: &MockPeerFactory, session: &TestSession) -> Arc<MockPeerState> {
    factory
        .peer(session.id())
        .expect("session should have a peer after its first offer")
}
