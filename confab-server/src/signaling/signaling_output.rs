use async_trait::async_trait;
use confab_core::IceCandidate;

/// Outbound half of a client's signaling channel.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_answer(&self, sdp: String);

    async fn send_offer(&self, sdp: String);

    async fn send_ice(&self, candidate: IceCandidate);
}
