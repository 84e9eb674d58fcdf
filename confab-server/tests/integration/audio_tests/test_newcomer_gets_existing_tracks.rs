use confab_server::{NegotiationState, SessionConfig, SfuRelay};

use crate::integration::init_tracing;
use crate::utils::{MockPeerFactory, TestSession, eventually, microphone, peer_of};

#[tokio::test]
async fn test_newcomer_receives_tracks_published_before_it_joined() {
    init_tracing();

    let relay = SfuRelay::new();
    let factory = MockPeerFactory::new();
    let config = SessionConfig::default();
    let mut a = TestSession::spawn(&relay, &factory, &config);
    a.join("t1").await.expect("a not answered");

    let (track, _packets) = microphone("a");
    peer_of(&factory, &a).emit_track(track);

    let team = confab_core::TeamId::from("t1");
    assert!(eventually(|| relay.track_count(&team) == 1).await);

    let mut c = TestSession::spawn(&relay, &factory, &config);
    c.join("t1").await.expect("c not answered");

    let peer_c = peer_of(&factory, &c);
    assert!(eventually(|| peer_c.forwarded().len() == 1).await);

    // Attaching the existing track renegotiates right after the answer.
    c.wait_for_offer().await.expect("c should be re-offered");
    c.wait_for_state(NegotiationState::Renegotiating)
        .await
        .expect("c should be renegotiating");
    c.answer();
    c.wait_for_state(NegotiationState::Stable)
        .await
        .expect("c should settle");
    assert_eq!(peer_c.forwarded().len(), 1);
}

#[tokio::test]
async fn test_burst_of_tracks_coalesces_into_few_offers() {
    init_tracing();

    let relay = SfuRelay::new();
    let factory = MockPeerFactory::new();
    let config = SessionConfig::default();
    let mut publishers = Vec::new();
    for _ in 0..3 {
        let mut p = TestSession::spawn(&relay, &factory, &config);
        p.join("t1").await.expect("publisher not answered");
        publishers.push(p);
    }
    let mut keep = Vec::new();
    for p in &publishers {
        let (track, tx) = microphone("p");
        peer_of(&factory, p).emit_track(track);
        keep.push(tx);
    }
    let team = confab_core::TeamId::from("t1");
    assert!(eventually(|| relay.track_count(&team) == 3).await);

    let mut late = TestSession::spawn(&relay, &factory, &config);
    late.join("t1").await.expect("late joiner not answered");
    let peer = peer_of(&factory, &late);
    assert!(eventually(|| peer.forwarded().len() == 3).await);

    // One server offer is outstanding at a time; answering drains the rest.
    late.wait_for_offer().await.expect("first re-offer");
    late.answer();
    late.wait_for_offer().await.expect("coalesced re-offer");
    late.answer();
    late.wait_for_state(NegotiationState::Stable)
        .await
        .expect("late joiner should settle");
    assert!(late.signaling.offers().await.len() <= 3);
}

#[tokio::test]
async fn test_one_failed_track_does_not_starve_the_newcomer() {
    init_tracing();

    let relay = SfuRelay::new();
    let factory = MockPeerFactory::new();
    let config = SessionConfig::default();
    let mut publishers = Vec::new();
    let mut keep = Vec::new();
    for _ in 0..3 {
        let mut p = TestSession::spawn(&relay, &factory, &config);
        p.join("t1").await.expect("publisher not answered");
        let (track, tx) = microphone("p");
        peer_of(&factory, &p).emit_track(track);
        keep.push(tx);
        publishers.push(p);
    }
    let team = confab_core::TeamId::from("t1");
    assert!(eventually(|| relay.track_count(&team) == 3).await);

    factory.fail_next_adds(1);
    let mut late = TestSession::spawn(&relay, &factory, &config);
    late.join("t1").await.expect("late joiner not answered");

    let peer = peer_of(&factory, &late);
    assert!(eventually(|| peer.forwarded().len() == 2).await);
    assert!(relay.members().is_member(&team, late.id()));

    // The session carries on and renegotiates for the tracks it did get.
    late.wait_for_offer().await.expect("late joiner should be re-offered");
}
