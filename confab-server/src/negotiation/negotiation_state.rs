use std::fmt;

/// Where a session stands in the offer/answer exchange with its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    /// No peer connection yet.
    Idle,
    /// Client offer applied, answer not sent yet.
    HasOffer,
    /// Descriptions agree on both sides.
    Stable,
    /// Server offer sent, waiting for the client's answer.
    Renegotiating,
    Closed,
}

impl NegotiationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationState::Idle => "idle",
            NegotiationState::HasOffer => "has-offer",
            NegotiationState::Stable => "stable",
            NegotiationState::Renegotiating => "renegotiating",
            NegotiationState::Closed => "closed",
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
