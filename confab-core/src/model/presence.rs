use crate::model::room::{RoomKey, RoomKind};
use serde::{Deserialize, Serialize};

/// Presentation metadata of someone in a room. Not an authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PresenceRequest {
    AddParticipant {
        team_id: String,
        kind: RoomKind,
        participant: String,
        #[serde(default)]
        name: String,
        #[serde(default, rename = "profilePicture")]
        profile_picture: String,
        #[serde(default)]
        color: String,
    },
    RemoveParticipant {
        team_id: String,
        kind: RoomKind,
        participant: String,
    },
    GetParticipants {
        team_id: String,
        kind: RoomKind,
    },
}

impl PresenceRequest {
    pub fn room_key(&self) -> RoomKey {
        match self {
            Self::AddParticipant { team_id, kind, .. }
            | Self::RemoveParticipant { team_id, kind, .. }
            | Self::GetParticipants { team_id, kind } => RoomKey::new(team_id.as_str(), *kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PresenceResponse {
    /// Pushed to the whole room after every membership change.
    UpdateParticipants { participants: Vec<Participant> },
    /// Direct reply to a `getParticipants` request.
    GetParticipants { participants: Vec<Participant> },
}
