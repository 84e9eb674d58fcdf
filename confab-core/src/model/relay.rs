use serde::Deserialize;

/// Frames of the plain pub/sub relay channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelayRequest {
    Subscribe { room: String },
    Publish { room: String, message: String },
    Ping { message: String },
}
