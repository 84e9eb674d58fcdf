use crate::error::TransportError;
use crate::sfu::ForwardingTrack;
use crate::transport::{PeerFactory, PeerSession, RemoteTrack, SessionEvent, TransportConfig};
use async_trait::async_trait;
use confab_core::{IceCandidate, SessionId, TrackId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Opens real webrtc-rs peer connections.
#[derive(Debug, Clone, Default)]
pub struct WebRtcPeerFactory {
    config: TransportConfig,
}

impl WebRtcPeerFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PeerFactory for WebRtcPeerFactory {
    async fn create(
        &self,
        session: SessionId,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Box<dyn PeerSession>, TransportError> {
        let peer = WebRtcPeer::new(session, &self.config, events).await?;
        Ok(Box::new(peer))
    }
}

pub struct WebRtcPeer {
    session: SessionId,
    peer_connection: Arc<RTCPeerConnection>,
    senders: DashMap<TrackId, Arc<RTCRtpSender>>,
}

impl WebRtcPeer {
    pub async fn new(
        session: SessionId,
        config: &TransportConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self, TransportError> {
        let mut media = MediaEngine::default();
        media.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media)?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config.rtc_ice_servers(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        // Receive the client's microphone and leave room for forwarded audio.
        peer_connection
            .add_transceiver_from_kind(
                RTPCodecType::Audio,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Sendrecv,
                    send_encodings: Vec::new(),
                }),
            )
            .await?;

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                info!("Peer connection state for {}: {}", session, s);
                if matches!(
                    s,
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed
                ) {
                    let _ = state_tx.send(SessionEvent::ConnectionLost);
                }
                Box::pin(async {})
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(SessionEvent::LocalCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_mline_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let negotiation_tx = events.clone();
        peer_connection.on_negotiation_needed(Box::new(move || {
            trace!("Negotiation needed for {}", session);
            let _ = negotiation_tx.send(SessionEvent::NegotiationNeeded);
            Box::pin(async {})
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                debug!(
                    "Inbound {} track {} from {}",
                    track.kind(),
                    track.id(),
                    session
                );
                let _ = track_tx.send(SessionEvent::RemoteTrack(RemoteTrack::from_webrtc(track)));
                Box::pin(async {})
            },
        ));

        Ok(Self {
            session,
            peer_connection,
            senders: DashMap::new(),
        })
    }
}

#[async_trait]
impl PeerSession for WebRtcPeer {
    async fn set_remote_offer(&self, sdp: String) -> Result<(), TransportError> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn set_remote_answer(&self, sdp: String) -> Result<(), TransportError> {
        let desc = RTCSessionDescription::answer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn create_answer(&self) -> Result<String, TransportError> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    async fn create_offer(&self) -> Result<String, TransportError> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(offer.sdp)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| TransportError::InvalidCandidate(e.to_string()))
    }

    async fn add_forwarding_track(
        &self,
        track: Arc<ForwardingTrack>,
    ) -> Result<(), TransportError> {
        let local = Arc::clone(track.local()) as Arc<dyn TrackLocal + Send + Sync>;
        let sender = self.peer_connection.add_track(local).await?;

        // Interceptors only see RTCP that somebody reads.
        let rtcp_sender = Arc::clone(&sender);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut buf).await.is_ok() {}
        });

        self.senders.insert(track.id(), sender);
        debug!("Forwarding track {} to {}", track.id(), self.session);
        Ok(())
    }

    async fn remove_forwarding_track(&self, track_id: TrackId) -> Result<(), TransportError> {
        let (_, sender) = self
            .senders
            .remove(&track_id)
            .ok_or(TransportError::UnknownTrack(track_id))?;
        self.peer_connection.remove_track(&sender).await?;
        debug!("Stopped forwarding track {} to {}", track_id, self.session);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.senders.clear();
        self.peer_connection.close().await?;
        Ok(())
    }
}
