mod ids;
mod note;
mod presence;
mod relay;
mod room;
mod signaling;

pub use ids::{SessionId, TeamId, TrackId};
pub use note::{Change, Document, Node, NoteAck, NoteMessage, Step, StepType};
pub use presence::{Participant, PresenceRequest, PresenceResponse};
pub use relay::RelayRequest;
pub use room::{RoomKey, RoomKind};
pub use signaling::{IceCandidate, IceServerConfig, SignalMessage};
