use confab_server::{NegotiationState, SessionConfig, SfuRelay};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{MockPeerFactory, TestSession, microphone, peer_of};

#[tokio::test]
async fn test_unanswered_reoffer_is_abandoned() {
    init_tracing();

    let relay = SfuRelay::new();
    let factory = MockPeerFactory::new();
    let config = SessionConfig {
        negotiation_timeout: Some(Duration::from_millis(200)),
    };
    let mut a = TestSession::spawn(&relay, &factory, &config);
    let mut b = TestSession::spawn(&relay, &factory, &config);
    a.join("t1").await.expect("a not answered");
    b.join("t1").await.expect("b not answered");

    let (track, _packets) = microphone("a");
    peer_of(&factory, &a).emit_track(track);
    b.wait_for_offer().await.expect("b should be re-offered");
    b.wait_for_state(NegotiationState::Renegotiating)
        .await
        .expect("b should be renegotiating");

    // B never answers.
    b.wait_for_state(NegotiationState::Stable)
        .await
        .expect("offer should be abandoned after the timeout");

    // The next topology change still gets an offer out.
    let (second, _more) = microphone("a2");
    peer_of(&factory, &a).emit_track(second);
    b.wait_for_offer().await.expect("b should be re-offered again");
}
