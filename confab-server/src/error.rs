use confab_core::{TeamId, TrackId};
use thiserror::Error;

/// Failure on a peer connection or a media track.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("webrtc: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("invalid ice candidate: {0}")]
    InvalidCandidate(String),

    #[error("track {0} is not attached to this peer")]
    UnknownTrack(TrackId),

    #[error("peer session closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("no peer session yet")]
    NoPeerSession,

    #[error("unexpected {message} while {state}")]
    UnexpectedMessage {
        message: &'static str,
        state: &'static str,
    },

    #[error("negotiation closed")]
    Closed,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failure reported by an external store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend: {0}")]
    Backend(String),

    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DocSyncError {
    #[error("step {index}: range {from}..{to} is outside text of {len} bytes")]
    OutOfRange {
        index: usize,
        from: i64,
        to: i64,
        len: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("document actor for team {0} stopped")]
    ActorGone(TeamId),
}
