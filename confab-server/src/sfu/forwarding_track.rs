use crate::error::TransportError;
use crate::transport::{RemoteTrack, RtpSource};
use confab_core::{SessionId, TrackId};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use webrtc::rtp::packet::Packet;
use webrtc::track::track_local::TrackLocalWriter;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;

/// Local mirror of one participant's inbound track.
///
/// A single `TrackLocalStaticRTP` is shared by every sibling peer it was
/// added to, so one write reaches all of them.
pub struct ForwardingTrack {
    id: TrackId,
    origin: SessionId,
    local: Arc<TrackLocalStaticRTP>,
}

impl ForwardingTrack {
    pub fn mirror(origin: SessionId, remote: &RemoteTrack) -> Self {
        let local = TrackLocalStaticRTP::new(
            remote.codec.clone(),
            remote.track_id.clone(),
            remote.stream_id.clone(),
        );
        Self {
            id: TrackId::new(),
            origin,
            local: Arc::new(local),
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Session whose client publishes this track.
    pub fn origin(&self) -> SessionId {
        self.origin
    }

    pub fn local(&self) -> &Arc<TrackLocalStaticRTP> {
        &self.local
    }

    pub async fn write(&self, packet: &Packet) -> Result<usize, TransportError> {
        Ok(self.local.write_rtp(packet).await?)
    }
}

impl fmt::Debug for ForwardingTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardingTrack")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardExit {
    Cancelled,
    SourceEnded,
    WriteFailed,
}

/// Copy packets from `source` into `track` until cancelled or either side fails.
pub async fn forward_rtp(
    source: Arc<dyn RtpSource>,
    track: Arc<ForwardingTrack>,
    cancel: CancellationToken,
) -> ForwardExit {
    let mut forwarded = 0u64;
    let exit = loop {
        tokio::select! {
            _ = cancel.cancelled() => break ForwardExit::Cancelled,
            read = source.next_packet() => match read {
                Ok(packet) => {
                    if let Err(e) = track.write(&packet).await {
                        debug!("Write to track {} failed: {}", track.id(), e);
                        break ForwardExit::WriteFailed;
                    }
                    forwarded += 1;
                }
                Err(e) => {
                    debug!("Source of track {} ended: {}", track.id(), e);
                    break ForwardExit::SourceEnded;
                }
            }
        }
    };
    debug!(
        "Forwarding loop for track {} from {} exited ({:?}) after {} packets",
        track.id(),
        track.origin(),
        exit,
        forwarded
    );
    exit
}
