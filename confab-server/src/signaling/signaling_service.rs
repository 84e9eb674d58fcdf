use crate::signaling::{SignalingOutput, text_frame};
use async_trait::async_trait;
use axum::extract::ws::Message;
use confab_core::{IceCandidate, SessionId, SignalMessage};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Signaling output backed by a connection's websocket writer queue.
#[derive(Clone)]
pub struct WsSignaling {
    session: SessionId,
    tx: mpsc::UnboundedSender<Message>,
}

impl WsSignaling {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { session, tx }
    }

    pub fn send_signal(&self, msg: &SignalMessage) {
        match text_frame(msg) {
            Ok(frame) => {
                if self.tx.send(frame).is_err() {
                    warn!(
                        "Attempted to send signal to disconnected session {}",
                        self.session
                    );
                }
            }
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
    }
}

#[async_trait]
impl SignalingOutput for WsSignaling {
    async fn send_answer(&self, sdp: String) {
        self.send_signal(&SignalMessage::answer(sdp));
    }

    async fn send_offer(&self, sdp: String) {
        self.send_signal(&SignalMessage::offer(sdp));
    }

    async fn send_ice(&self, candidate: IceCandidate) {
        self.send_signal(&SignalMessage::ice_candidate(candidate));
    }
}
