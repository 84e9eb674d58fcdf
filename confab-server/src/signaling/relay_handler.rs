use crate::auth::authorize;
use crate::room::{Member, RoomRegistry};
use crate::signaling::{AppState, FrameHandler, TokenQuery, outbound, run_connection};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use confab_core::{RelayRequest, SessionId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Room that `ping` frames are published to.
pub const PONG_ROOM: &str = "pong";

pub async fn relay_ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    State(state): State<AppState>,
) -> Response {
    if let Err(e) = authorize(state.verifier.as_ref(), &headers, query.token.as_deref()) {
        warn!("Rejected relay connection: {}", e);
        return e.into_response();
    }
    ws.on_upgrade(move |socket| handle_relay_socket(socket, state.relay_rooms))
}

async fn handle_relay_socket(socket: WebSocket, rooms: RoomRegistry<String, Message>) {
    let session = SessionId::new();
    let (tx, rx) = outbound();
    let mut connection = RelayConnection::new(session, rooms, tx);
    run_connection(
        socket,
        session,
        "relay",
        rx,
        &mut connection,
        CancellationToken::new(),
    )
    .await;
}

/// Plain pub/sub: messages are delivered verbatim to every subscriber.
pub struct RelayConnection {
    session: SessionId,
    rooms: RoomRegistry<String, Message>,
    outbound: mpsc::UnboundedSender<Message>,
}

impl RelayConnection {
    pub fn new(
        session: SessionId,
        rooms: RoomRegistry<String, Message>,
        outbound: mpsc::UnboundedSender<Message>,
    ) -> Self {
        Self {
            session,
            rooms,
            outbound,
        }
    }

    pub fn handle(&mut self, request: RelayRequest) {
        match request {
            RelayRequest::Subscribe { room } => {
                self.rooms
                    .join(room, Member::new(self.session, self.outbound.clone()));
            }
            RelayRequest::Publish { room, message } => self.publish(&room, message),
            RelayRequest::Ping { message } => self.publish(PONG_ROOM, message),
        }
    }

    fn publish(&self, room: &str, message: String) {
        let delivered = self
            .rooms
            .broadcast(&room.to_owned(), Message::Text(message.into()), None);
        debug!("Relayed message in {} to {} subscribers", room, delivered);
    }
}

#[async_trait]
impl FrameHandler for RelayConnection {
    async fn on_text(&mut self, text: &str) {
        match serde_json::from_str::<RelayRequest>(text) {
            Ok(request) => self.handle(request),
            Err(e) => warn!("Invalid relay message from {}: {}", self.session, e),
        }
    }

    async fn on_close(&mut self) {
        self.rooms.leave_all(self.session);
    }
}
