use crate::auth::authorize;
use crate::sfu::{AudioSession, AudioSessionHandle};
use crate::signaling::{AppState, FrameHandler, TokenQuery, WsSignaling, outbound, run_connection};
use async_trait::async_trait;
use axum::extract::ws::WebSocket;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use confab_core::{SessionId, SignalMessage};
use std::sync::Arc;
use tracing::warn;

pub async fn audio_ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    State(state): State<AppState>,
) -> Response {
    if let Err(e) = authorize(state.verifier.as_ref(), &headers, query.token.as_deref()) {
        warn!("Rejected audio connection: {}", e);
        return e.into_response();
    }
    ws.on_upgrade(move |socket| handle_audio_socket(socket, state))
}

async fn handle_audio_socket(socket: WebSocket, state: AppState) {
    let session = SessionId::new();
    let (tx, rx) = outbound();
    let signaling = Arc::new(WsSignaling::new(session, tx));
    let handle = AudioSession::spawn(
        session,
        state.sfu.clone(),
        Arc::clone(&state.peers),
        signaling,
        &state.session_config,
    );
    let cancel = handle.cancellation().clone();
    let mut connection = AudioConnection {
        session,
        handle: Some(handle),
    };
    run_connection(socket, session, "audio", rx, &mut connection, cancel).await;
}

/// Feeds a client's signaling frames into its audio session.
pub struct AudioConnection {
    session: SessionId,
    handle: Option<AudioSessionHandle>,
}

#[async_trait]
impl FrameHandler for AudioConnection {
    async fn on_text(&mut self, text: &str) {
        let signal = match serde_json::from_str::<SignalMessage>(text) {
            Ok(signal) => signal,
            Err(e) => {
                warn!("Invalid SignalMessage from {}: {}", self.session, e);
                return;
            }
        };
        if let Some(handle) = &self.handle {
            if !handle.signal(signal) {
                warn!("Audio session {} already stopped", self.session);
            }
        }
    }

    async fn on_close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
            handle.join().await;
        }
    }
}
