use confab_core::IceServerConfig;
use std::time::Duration;
use webrtc::ice_transport::ice_server::RTCIceServer;

/// STUN/TURN servers handed to every peer connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl TransportConfig {
    pub(crate) fn rtc_ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers
            .iter()
            .map(|s| RTCIceServer {
                urls: s.urls.clone(),
                username: s.username.clone().unwrap_or_default(),
                credential: s.credential.clone().unwrap_or_default(),
            })
            .collect()
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec!["stun:stun.l.google.com:19302".to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}

/// Per-session negotiation policy.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a server re-offer may wait for its answer. `None` waits forever.
    pub negotiation_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            negotiation_timeout: Some(Duration::from_secs(10)),
        }
    }
}
