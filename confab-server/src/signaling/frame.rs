use axum::extract::ws::Message;
use serde::Serialize;

/// Encode `value` as a JSON text frame.
pub fn text_frame<T: Serialize>(value: &T) -> Result<Message, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(Message::Text(json.into()))
}
