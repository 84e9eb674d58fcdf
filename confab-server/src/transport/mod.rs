mod media;
mod peer_session;
mod transport_config;
mod transport_event;
mod webrtc_peer;

pub use media::*;
pub use peer_session::*;
pub use transport_config::*;
pub use transport_event::*;
pub use webrtc_peer::*;
