use crate::sfu::ForwardingTrack;
use crate::transport::RemoteTrack;
use confab_core::{IceCandidate, SignalMessage, TrackId};
use std::sync::Arc;

/// Everything an audio session reacts to, in the order it arrived.
///
/// Client frames, peer-connection callbacks and relay instructions from
/// sibling sessions all land on the same per-session queue.
#[derive(Clone)]
pub enum SessionEvent {
    /// Decoded frame from the client's signaling socket.
    Signal(SignalMessage),

    /// The peer connection's media topology changed and needs a new offer.
    NegotiationNeeded,

    /// The client started sending a media track.
    RemoteTrack(RemoteTrack),

    /// A local ICE candidate to trickle to the client.
    LocalCandidate(IceCandidate),

    /// The peer connection failed or was closed underneath us.
    ConnectionLost,

    /// A sibling's track to start sending to this client.
    Forward(Arc<ForwardingTrack>),

    /// A previously forwarded track ended.
    Unforward(TrackId),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Signal(SignalMessage::Offer { .. }) => "offer",
            SessionEvent::Signal(SignalMessage::Answer { .. }) => "answer",
            SessionEvent::Signal(SignalMessage::IceCandidate { .. }) => "iceCandidate",
            SessionEvent::NegotiationNeeded => "negotiationNeeded",
            SessionEvent::RemoteTrack(_) => "remoteTrack",
            SessionEvent::LocalCandidate(_) => "localCandidate",
            SessionEvent::ConnectionLost => "connectionLost",
            SessionEvent::Forward(_) => "forward",
            SessionEvent::Unforward(_) => "unforward",
        }
    }
}
