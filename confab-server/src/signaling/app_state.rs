use crate::auth::TokenVerifier;
use crate::doc::{DocSyncEngine, DocumentStore};
use crate::presence::{ParticipantStore, PresenceService};
use crate::room::RoomRegistry;
use crate::sfu::SfuRelay;
use crate::signaling::{audio_ws_handler, note_ws_handler, presence_ws_handler, relay_ws_handler};
use crate::transport::{PeerFactory, SessionConfig};
use axum::Json;
use axum::Router;
use axum::extract::ws::Message;
use axum::routing::get;
use confab_core::RoomKey;
use serde::Deserialize;
use std::sync::Arc;

/// Everything the websocket handlers share.
///
/// Each channel keeps its own registry so traffic never crosses channels.
#[derive(Clone)]
pub struct AppState {
    pub presence: PresenceService,
    pub docs: DocSyncEngine,
    pub note_rooms: RoomRegistry<RoomKey, Message>,
    pub relay_rooms: RoomRegistry<String, Message>,
    pub sfu: SfuRelay,
    pub peers: Arc<dyn PeerFactory>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub session_config: SessionConfig,
}

impl AppState {
    pub fn new(
        participants: Arc<dyn ParticipantStore>,
        documents: Arc<dyn DocumentStore>,
        peers: Arc<dyn PeerFactory>,
        verifier: Arc<dyn TokenVerifier>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            presence: PresenceService::new(participants),
            docs: DocSyncEngine::new(documents),
            note_rooms: RoomRegistry::new(),
            relay_rooms: RoomRegistry::new(),
            sfu: SfuRelay::new(),
            peers,
            verifier,
            session_config,
        }
    }
}

/// Query string accepted by every websocket route.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "UP" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(presence_ws_handler))
        .route("/webrtc/audio", get(audio_ws_handler))
        .route("/ws/note/{team_id}", get(note_ws_handler))
        .route("/ws/relay", get(relay_ws_handler))
        .with_state(state)
}
