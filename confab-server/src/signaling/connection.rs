use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use confab_core::SessionId;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Per-channel behaviour of one websocket connection.
#[async_trait]
pub trait FrameHandler: Send {
    async fn on_text(&mut self, text: &str);

    /// Runs once after the socket is done, whichever side ended it.
    async fn on_close(&mut self) {}
}

/// Outbound queue of a connection. Anything holding a clone can write to it.
pub fn outbound() -> (
    mpsc::UnboundedSender<Message>,
    mpsc::UnboundedReceiver<Message>,
) {
    mpsc::unbounded_channel()
}

/// Drive `socket` until the client leaves, the writer fails or `cancel` fires.
///
/// Frames from `outbound_rx` go out on a writer task; inbound text frames are
/// handed to `handler` in arrival order.
pub async fn run_connection<H: FrameHandler>(
    socket: WebSocket,
    session: SessionId,
    channel: &'static str,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
    handler: &mut H,
    cancel: CancellationToken,
) {
    info!("New {} connection: {}", channel, session);

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    loop {
        tokio::select! {
            _ = &mut send_task => break,
            _ = cancel.cancelled() => break,
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => handler.on_text(text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("{} connection {} read error: {}", channel, session, e);
                    break;
                }
            }
        }
    }

    send_task.abort();
    handler.on_close().await;
    info!("{} connection closed: {}", channel, session);
}
