use crate::model::ids::TeamId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Canvas,
    Note,
    Audio,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Canvas => "canvas",
            RoomKind::Note => "note",
            RoomKind::Audio => "audio",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key of a presence or note room.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RoomKey {
    pub team: TeamId,
    pub kind: RoomKind,
}

impl RoomKey {
    pub fn new(team: impl Into<TeamId>, kind: RoomKind) -> Self {
        Self {
            team: team.into(),
            kind,
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.team, self.kind)
    }
}
