use crate::error::TransportError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use webrtc::rtp::packet::Packet;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_remote::TrackRemote;

/// Read side of an inbound media track.
#[async_trait]
pub trait RtpSource: Send + Sync {
    async fn next_packet(&self) -> Result<Packet, TransportError>;
}

#[async_trait]
impl RtpSource for TrackRemote {
    async fn next_packet(&self) -> Result<Packet, TransportError> {
        let (packet, _attributes) = self.read_rtp().await?;
        Ok(packet)
    }
}

/// Media a client is sending us, as reported by the peer connection.
#[derive(Clone)]
pub struct RemoteTrack {
    pub track_id: String,
    pub stream_id: String,
    pub codec: RTCRtpCodecCapability,
    pub source: Arc<dyn RtpSource>,
}

impl RemoteTrack {
    pub fn from_webrtc(track: Arc<TrackRemote>) -> Self {
        Self {
            track_id: track.id(),
            stream_id: track.stream_id(),
            codec: track.codec().capability,
            source: track,
        }
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("track_id", &self.track_id)
            .field("stream_id", &self.stream_id)
            .field("mime_type", &self.codec.mime_type)
            .finish()
    }
}
