use confab_core::TeamId;
use confab_server::{NegotiationState, SessionConfig, SfuRelay};

use crate::integration::init_tracing;
use crate::utils::{MockPeerFactory, TestSession, eventually, microphone, peer_of, rtp_packet};

#[tokio::test]
async fn test_track_reaches_the_other_member_only() {
    init_tracing();

    let relay = SfuRelay::new();
    let factory = MockPeerFactory::new();
    let config = SessionConfig::default();
    let mut a = TestSession::spawn(&relay, &factory, &config);
    let mut b = TestSession::spawn(&relay, &factory, &config);
    a.join("t1").await.expect("a not answered");
    b.join("t1").await.expect("b not answered");

    let (track, packets) = microphone("a");
    peer_of(&factory, &a).emit_track(track);

    // B is re-offered with A's audio; A is not.
    b.wait_for_offer().await.expect("b should be re-offered");
    b.wait_for_state(NegotiationState::Renegotiating)
        .await
        .expect("b should be renegotiating");

    let peer_b = peer_of(&factory, &b);
    assert!(eventually(|| peer_b.forwarded().len() == 1).await);
    assert!(peer_of(&factory, &a).forwarded().is_empty());
    assert!(a.signaling.offers().await.is_empty());
    assert_eq!(relay.track_count(&TeamId::from("t1")), 1);

    // Packets keep flowing while the track is live.
    for seq in 0..5 {
        packets.send(rtp_packet(seq)).expect("forwarding loop stopped");
    }

    b.answer();
    b.wait_for_state(NegotiationState::Stable)
        .await
        .expect("b should settle");
}

#[tokio::test]
async fn test_each_pair_gets_each_track_once() {
    init_tracing();

    let relay = SfuRelay::new();
    let factory = MockPeerFactory::new();
    let config = SessionConfig::default();
    let mut a = TestSession::spawn(&relay, &factory, &config);
    let mut b = TestSession::spawn(&relay, &factory, &config);
    a.join("t1").await.expect("a not answered");
    b.join("t1").await.expect("b not answered");

    let (track_a, _pa) = microphone("a");
    let (track_b, _pb) = microphone("b");
    peer_of(&factory, &a).emit_track(track_a);
    peer_of(&factory, &b).emit_track(track_b);

    let peer_a = peer_of(&factory, &a);
    let peer_b = peer_of(&factory, &b);
    assert!(eventually(|| peer_a.forwarded().len() == 1 && peer_b.forwarded().len() == 1).await);
    assert_ne!(peer_a.forwarded(), peer_b.forwarded());
}

#[tokio::test]
async fn test_rooms_do_not_share_audio() {
    init_tracing();

    let relay = SfuRelay::new();
    let factory = MockPeerFactory::new();
    let config = SessionConfig::default();
    let mut a = TestSession::spawn(&relay, &factory, &config);
    let mut b = TestSession::spawn(&relay, &factory, &config);
    a.join("t1").await.expect("a not answered");
    b.join("t2").await.expect("b not answered");

    let (track, _packets) = microphone("a");
    peer_of(&factory, &a).emit_track(track);

    assert!(eventually(|| relay.track_count(&TeamId::from("t1")) == 1).await);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(peer_of(&factory, &b).forwarded().is_empty());
    assert!(b.signaling.offers().await.is_empty());
}
