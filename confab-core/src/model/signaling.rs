use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Browser-shaped `RTCIceCandidateInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        default,
        rename = "sdpMLineIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Audio signaling channel frame, used in both directions.
///
/// Clients may tag any frame with `teamId`; the server never sets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SignalMessage {
    Offer {
        sdp: String,
        #[serde(
            default,
            rename = "teamId",
            skip_serializing_if = "Option::is_none"
        )]
        team_id: Option<String>,
    },
    Answer {
        sdp: String,
        #[serde(
            default,
            rename = "teamId",
            skip_serializing_if = "Option::is_none"
        )]
        team_id: Option<String>,
    },
    IceCandidate {
        candidate: IceCandidate,
        #[serde(
            default,
            rename = "teamId",
            skip_serializing_if = "Option::is_none"
        )]
        team_id: Option<String>,
    },
}

impl SignalMessage {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self::Offer {
            sdp: sdp.into(),
            team_id: None,
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self::Answer {
            sdp: sdp.into(),
            team_id: None,
        }
    }

    pub fn ice_candidate(candidate: IceCandidate) -> Self {
        Self::IceCandidate {
            candidate,
            team_id: None,
        }
    }

    pub fn team_id(&self) -> Option<&str> {
        match self {
            Self::Offer { team_id, .. }
            | Self::Answer { team_id, .. }
            | Self::IceCandidate { team_id, .. } => team_id.as_deref(),
        }
    }
}
