mod app_state;
mod audio_handler;
mod connection;
mod frame;
mod note_handler;
mod presence_handler;
mod relay_handler;
mod signaling_output;
mod signaling_service;

pub use app_state::*;
pub use audio_handler::*;
pub use connection::*;
pub use frame::*;
pub use note_handler::*;
pub use presence_handler::*;
pub use relay_handler::*;
pub use signaling_output::*;
pub use signaling_service::*;
