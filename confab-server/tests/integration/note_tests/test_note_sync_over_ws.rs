use confab_core::{RoomKey, RoomKind, TeamId};
use serde_json::{Value, json};

use crate::integration::init_tracing;
use crate::utils::{connect, eventually, expect_silence, recv_json, send_json, spawn_open_server};

fn typed(version: u64, client: &str, at: i64, text: &str) -> Value {
    json!({
        "type": "note",
        "version": version,
        "clientID": client,
        "steps": [{
            "stepType": "replace",
            "from": at,
            "to": at,
            "slice": {"content": [{"type": "text", "text": text}]}
        }]
    })
}

fn note_room(team: &str) -> RoomKey {
    RoomKey::new(team, RoomKind::Note)
}

fn doc_text(ack: &Value) -> String {
    ack["doc"]["content"][0]["content"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_owned()
}

#[tokio::test]
async fn test_applied_change_is_acked_and_broadcast() {
    init_tracing();
    let (addr, state) = spawn_open_server().await.expect("server");

    let mut a = connect(addr, "/ws/note/t1").await.unwrap();
    let mut b = connect(addr, "/ws/note/t1").await.unwrap();
    assert!(eventually(|| state.note_rooms.member_ids(&note_room("t1")).len() == 2).await);

    send_json(&mut a, &typed(1, "ca", 0, "Hi")).await.unwrap();

    let ack = recv_json(&mut a).await.unwrap();
    assert_eq!(ack["type"], "ackSteps");
    assert_eq!(ack["version"], 1);
    assert_eq!(ack["clientID"], "ca");
    assert_eq!(doc_text(&ack), "Hi");

    let pushed = recv_json(&mut b).await.unwrap();
    assert_eq!(pushed, ack);

    let stored = state.docs.snapshot(&TeamId::from("t1")).await.unwrap();
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn test_stale_change_is_answered_to_its_author_only() {
    init_tracing();
    let (addr, state) = spawn_open_server().await.expect("server");

    let mut a = connect(addr, "/ws/note/t1").await.unwrap();
    let mut b = connect(addr, "/ws/note/t1").await.unwrap();
    assert!(eventually(|| state.note_rooms.member_ids(&note_room("t1")).len() == 2).await);

    send_json(&mut a, &typed(1, "ca", 0, "Hi")).await.unwrap();
    recv_json(&mut a).await.unwrap();
    recv_json(&mut b).await.unwrap();

    // B was still on version 0.
    send_json(&mut b, &typed(1, "cb", 0, "X")).await.unwrap();
    let ack = recv_json(&mut b).await.unwrap();
    assert_eq!(ack["version"], 1);
    assert_eq!(ack["clientID"], "cb");
    assert_eq!(doc_text(&ack), "Hi");
    assert!(expect_silence(&mut a, 150).await);

    send_json(&mut b, &typed(2, "cb", 2, " there")).await.unwrap();
    let ack = recv_json(&mut b).await.unwrap();
    assert_eq!(doc_text(&ack), "Hi there");
    let pushed = recv_json(&mut a).await.unwrap();
    assert_eq!(pushed["version"], 2);
}

#[tokio::test]
async fn test_invalid_change_gets_no_ack() {
    init_tracing();
    let (addr, _state) = spawn_open_server().await.expect("server");

    let mut a = connect(addr, "/ws/note/t1").await.unwrap();
    send_json(&mut a, &typed(1, "ca", 5, "out of range")).await.unwrap();
    assert!(expect_silence(&mut a, 150).await);

    send_json(&mut a, &typed(1, "ca", 0, "ok")).await.unwrap();
    let ack = recv_json(&mut a).await.unwrap();
    assert_eq!(ack["version"], 1);
}

#[tokio::test]
async fn test_teams_edit_separate_notes() {
    init_tracing();
    let (addr, _state) = spawn_open_server().await.expect("server");

    let mut t1 = connect(addr, "/ws/note/t1").await.unwrap();
    let mut t2 = connect(addr, "/ws/note/t2").await.unwrap();

    send_json(&mut t1, &typed(1, "c1", 0, "one")).await.unwrap();
    recv_json(&mut t1).await.unwrap();
    assert!(expect_silence(&mut t2, 150).await);

    send_json(&mut t2, &typed(1, "c2", 0, "two")).await.unwrap();
    let ack = recv_json(&mut t2).await.unwrap();
    assert_eq!(doc_text(&ack), "two");
}

#[tokio::test]
async fn test_document_actor_stops_with_the_last_editor() {
    init_tracing();
    let (addr, state) = spawn_open_server().await.expect("server");

    let mut a = connect(addr, "/ws/note/t1").await.unwrap();
    let b = connect(addr, "/ws/note/t1").await.unwrap();
    assert!(eventually(|| state.note_rooms.member_ids(&note_room("t1")).len() == 2).await);

    send_json(&mut a, &typed(1, "ca", 0, "Hi")).await.unwrap();
    recv_json(&mut a).await.unwrap();
    assert_eq!(state.docs.active_teams(), 1);

    drop(b);
    assert!(eventually(|| state.note_rooms.member_ids(&note_room("t1")).len() == 1).await);
    assert_eq!(state.docs.active_teams(), 1);

    drop(a);
    assert!(eventually(|| state.docs.active_teams() == 0).await);
    assert!(!state.note_rooms.contains_room(&note_room("t1")));

    // A later editor picks the note up where it was left.
    let mut c = connect(addr, "/ws/note/t1").await.unwrap();
    send_json(&mut c, &typed(2, "cc", 2, "!")).await.unwrap();
    let ack = recv_json(&mut c).await.unwrap();
    assert_eq!(ack["version"], 2);
    assert_eq!(doc_text(&ack), "Hi!");
}
