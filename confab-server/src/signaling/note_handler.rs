use crate::auth::authorize;
use crate::doc::DocSyncEngine;
use crate::room::{Member, RoomRegistry};
use crate::signaling::{AppState, FrameHandler, TokenQuery, outbound, run_connection, text_frame};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use confab_core::{NoteAck, NoteMessage, RoomKey, RoomKind, SessionId, TeamId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub async fn note_ws_handler(
    ws: WebSocketUpgrade,
    Path(team_id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    State(state): State<AppState>,
) -> Response {
    if let Err(e) = authorize(state.verifier.as_ref(), &headers, query.token.as_deref()) {
        warn!("Rejected note connection for team {}: {}", team_id, e);
        return e.into_response();
    }
    let team = TeamId::new(team_id);
    ws.on_upgrade(move |socket| handle_note_socket(socket, team, state))
}

async fn handle_note_socket(socket: WebSocket, team: TeamId, state: AppState) {
    let session = SessionId::new();
    let (tx, rx) = outbound();
    let mut connection = NoteConnection::open(session, team, state.docs, state.note_rooms, tx);
    run_connection(
        socket,
        session,
        "note",
        rx,
        &mut connection,
        CancellationToken::new(),
    )
    .await;
}

/// One editor attached to a team's note.
pub struct NoteConnection {
    session: SessionId,
    team: TeamId,
    room: RoomKey,
    docs: DocSyncEngine,
    rooms: RoomRegistry<RoomKey, Message>,
    outbound: mpsc::UnboundedSender<Message>,
}

impl NoteConnection {
    /// Join the team's note room.
    pub fn open(
        session: SessionId,
        team: TeamId,
        docs: DocSyncEngine,
        rooms: RoomRegistry<RoomKey, Message>,
        outbound: mpsc::UnboundedSender<Message>,
    ) -> Self {
        let room = RoomKey::new(team.clone(), RoomKind::Note);
        rooms.join(room.clone(), Member::new(session, outbound.clone()));
        Self {
            session,
            team,
            room,
            docs,
            rooms,
            outbound,
        }
    }

    pub async fn handle(&mut self, message: NoteMessage) {
        let NoteMessage::Note(change) = message;
        let client_id = change.client_id.clone();

        let outcome = match self.docs.apply_change(&self.team, change).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Change from {} on team {} rejected: {}", client_id, self.team, e);
                return;
            }
        };

        let ack = NoteAck::AckSteps {
            version: outcome.version,
            client_id,
            doc: outcome.doc,
        };
        let frame = match text_frame(&ack) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize note ack: {}", e);
                return;
            }
        };

        if outcome.applied {
            let others = self
                .rooms
                .broadcast(&self.room, frame.clone(), Some(self.session));
            debug!(
                "Team {} note v{} sent to {} other editors",
                self.team, outcome.version, others
            );
        }
        let _ = self.outbound.send(frame);
    }
}

#[async_trait]
impl FrameHandler for NoteConnection {
    async fn on_text(&mut self, text: &str) {
        match serde_json::from_str::<NoteMessage>(text) {
            Ok(message) => self.handle(message).await,
            Err(e) => warn!("Invalid note message from {}: {}", self.session, e),
        }
    }

    async fn on_close(&mut self) {
        if self.rooms.leave(&self.room, self.session) {
            // Last editor gone. A concurrent joiner keeps the actor alive.
            let (rooms, room) = (&self.rooms, &self.room);
            self.docs.release_if(&self.team, || !rooms.contains_room(room));
        }
    }
}
