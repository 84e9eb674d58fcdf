use crate::error::TransportError;
use crate::sfu::ForwardingTrack;
use crate::transport::SessionEvent;
use async_trait::async_trait;
use confab_core::{IceCandidate, SessionId, TrackId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One client's peer connection as the negotiation engine drives it.
///
/// Implementations report asynchronous happenings (negotiation needed,
/// inbound tracks, local candidates, connection loss) on the event sender
/// they were created with.
#[async_trait]
pub trait PeerSession: Send + Sync {
    async fn set_remote_offer(&self, sdp: String) -> Result<(), TransportError>;

    async fn set_remote_answer(&self, sdp: String) -> Result<(), TransportError>;

    /// Create an answer and install it as the local description.
    async fn create_answer(&self) -> Result<String, TransportError>;

    /// Create an offer and install it as the local description.
    async fn create_offer(&self) -> Result<String, TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    /// Start sending `track` to this client. Raises negotiation-needed.
    async fn add_forwarding_track(&self, track: Arc<ForwardingTrack>)
    -> Result<(), TransportError>;

    /// Stop sending a track added earlier. Raises negotiation-needed.
    async fn remove_forwarding_track(&self, track_id: TrackId) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait PeerFactory: Send + Sync {
    /// Open a peer connection for `session` with a send-receive audio transceiver.
    async fn create(
        &self,
        session: SessionId,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Box<dyn PeerSession>, TransportError>;
}
