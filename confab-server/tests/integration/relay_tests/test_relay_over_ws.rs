use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{connect, eventually, expect_silence, recv_text, send_json, spawn_open_server};

#[tokio::test]
async fn test_publish_reaches_every_subscriber_including_the_sender() {
    init_tracing();
    let (addr, state) = spawn_open_server().await.expect("server");

    let mut a = connect(addr, "/ws/relay").await.unwrap();
    let mut b = connect(addr, "/ws/relay").await.unwrap();
    let mut outsider = connect(addr, "/ws/relay").await.unwrap();
    for ws in [&mut a, &mut b] {
        send_json(ws, &json!({"type": "subscribe", "room": "r1"}))
            .await
            .unwrap();
    }
    send_json(&mut outsider, &json!({"type": "subscribe", "room": "r2"}))
        .await
        .unwrap();
    let subscribed = |room: &str, n: usize| state.relay_rooms.member_ids(&room.to_owned()).len() == n;
    assert!(eventually(|| subscribed("r1", 2) && subscribed("r2", 1)).await);

    send_json(
        &mut a,
        &json!({"type": "publish", "room": "r1", "message": "{\"x\":1}"}),
    )
    .await
    .unwrap();

    assert_eq!(recv_text(&mut a).await.unwrap(), "{\"x\":1}");
    assert_eq!(recv_text(&mut b).await.unwrap(), "{\"x\":1}");
    assert!(expect_silence(&mut outsider, 150).await);
}

#[tokio::test]
async fn test_ping_publishes_to_the_pong_room() {
    init_tracing();
    let (addr, state) = spawn_open_server().await.expect("server");

    let mut listener = connect(addr, "/ws/relay").await.unwrap();
    send_json(&mut listener, &json!({"type": "subscribe", "room": "pong"}))
        .await
        .unwrap();
    let pong = "pong".to_owned();
    assert!(eventually(|| state.relay_rooms.member_ids(&pong).len() == 1).await);

    let mut pinger = connect(addr, "/ws/relay").await.unwrap();
    send_json(&mut pinger, &json!({"type": "ping", "message": "hello"}))
        .await
        .unwrap();

    assert_eq!(recv_text(&mut listener).await.unwrap(), "hello");
    assert!(expect_silence(&mut pinger, 150).await);
}
