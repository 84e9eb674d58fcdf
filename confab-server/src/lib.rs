pub mod auth;
pub mod doc;
mod error;
pub mod negotiation;
pub mod presence;
pub mod room;
pub mod sfu;
pub mod signaling;
pub mod transport;

pub use auth::*;
pub use doc::*;
pub use error::*;
pub use negotiation::*;
pub use presence::*;
pub use room::*;
pub use sfu::*;
pub use signaling::*;
pub use transport::*;
