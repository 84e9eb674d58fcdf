mod audio_session;
mod forwarding_track;
mod sfu_relay;

pub use audio_session::*;
pub use forwarding_track::*;
pub use sfu_relay::*;
