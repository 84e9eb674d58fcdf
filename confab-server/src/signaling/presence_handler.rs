use crate::auth::authorize;
use crate::presence::PresenceService;
use crate::room::Member;
use crate::signaling::{AppState, FrameHandler, TokenQuery, outbound, run_connection, text_frame};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use confab_core::{Participant, PresenceRequest, PresenceResponse, RoomKey, SessionId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

pub async fn presence_ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    State(state): State<AppState>,
) -> Response {
    if let Err(e) = authorize(state.verifier.as_ref(), &headers, query.token.as_deref()) {
        warn!("Rejected presence connection: {}", e);
        return e.into_response();
    }
    ws.on_upgrade(move |socket| handle_presence_socket(socket, state.presence))
}

async fn handle_presence_socket(socket: WebSocket, presence: PresenceService) {
    let session = SessionId::new();
    let (tx, rx) = outbound();
    let mut connection = PresenceConnection::new(session, presence, tx);
    run_connection(
        socket,
        session,
        "presence",
        rx,
        &mut connection,
        CancellationToken::new(),
    )
    .await;
}

/// Presence state of one connection.
pub struct PresenceConnection {
    session: SessionId,
    presence: PresenceService,
    outbound: mpsc::UnboundedSender<Message>,
    /// Last participant this connection added, removed again on disconnect.
    last_joined: Option<(RoomKey, String)>,
}

impl PresenceConnection {
    pub fn new(
        session: SessionId,
        presence: PresenceService,
        outbound: mpsc::UnboundedSender<Message>,
    ) -> Self {
        Self {
            session,
            presence,
            outbound,
            last_joined: None,
        }
    }

    pub async fn handle(&mut self, request: PresenceRequest) {
        let room = request.room_key();
        match request {
            PresenceRequest::AddParticipant {
                participant,
                name,
                profile_picture,
                color,
                ..
            } => {
                self.presence
                    .attach(room.clone(), Member::new(self.session, self.outbound.clone()));
                let entry = Participant {
                    id: participant.clone(),
                    name,
                    profile_picture,
                    color,
                };
                match self.presence.add_participant(&room, entry).await {
                    Ok(()) => self.last_joined = Some((room, participant)),
                    Err(e) => error!("Failed to add participant {}: {}", participant, e),
                }
            }
            PresenceRequest::RemoveParticipant { participant, .. } => {
                if let Err(e) = self.presence.remove_participant(&room, &participant).await {
                    error!("Failed to remove participant {}: {}", participant, e);
                    return;
                }
                if self
                    .last_joined
                    .as_ref()
                    .is_some_and(|(r, p)| *r == room && *p == participant)
                {
                    self.last_joined = None;
                }
            }
            PresenceRequest::GetParticipants { .. } => {
                let participants = match self.presence.list(&room).await {
                    Ok(participants) => participants,
                    Err(e) => {
                        error!("Failed to list participants of {}: {}", room, e);
                        return;
                    }
                };
                match text_frame(&PresenceResponse::GetParticipants { participants }) {
                    Ok(frame) => {
                        let _ = self.outbound.send(frame);
                    }
                    Err(e) => error!("Failed to serialize participant list: {}", e),
                }
            }
        }
    }
}

#[async_trait]
impl FrameHandler for PresenceConnection {
    async fn on_text(&mut self, text: &str) {
        match serde_json::from_str::<PresenceRequest>(text) {
            Ok(request) => self.handle(request).await,
            Err(e) => warn!("Invalid presence message from {}: {}", self.session, e),
        }
    }

    async fn on_close(&mut self) {
        self.presence.detach_all(self.session);
        if let Some((room, participant)) = self.last_joined.take() {
            if let Err(e) = self.presence.remove_participant(&room, &participant).await {
                error!(
                    "Failed to remove participant {} after disconnect: {}",
                    participant, e
                );
            }
        }
    }
}
