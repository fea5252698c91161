//! Integration tests for `Channel` over an in-memory connection.
//!
//! The test plays the server on the other end of a `MemoryConnection`
//! pair, writing raw JSON frames and reading what the client sent.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use duel_protocol::{
    Action, ClientPayload, JsonCodec, Message, PlayerId, PromptId,
};
use duel_session::{
    Channel, ChannelConfig, ConnectionState, SessionError, SideChannel,
    SideChannelConfig, Signal,
};
use duel_transport::{Connection, MemoryConnection};
use serde_json::{Value, json};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

struct Harness {
    channel: Channel<MemoryConnection>,
    signals: mpsc::UnboundedReceiver<Signal>,
    server: MemoryConnection,
    errors: Arc<Mutex<Vec<String>>>,
}

fn harness_with(config: ChannelConfig) -> Harness {
    let (client, server) = MemoryConnection::pair();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let side = SideChannel::with_fallback(SideChannelConfig::default(), |_: &str| {});
    let sink = Arc::clone(&errors);
    side.set_error_handler(move |n| sink.lock().unwrap().push(n.message));
    let (channel, signals) = Channel::open(client, JsonCodec, side, config);
    Harness { channel, signals, server, errors }
}

fn harness() -> Harness {
    harness_with(ChannelConfig::default())
}

async fn push(server: &MemoryConnection, frame: Value) {
    server.send(frame.to_string().as_bytes()).await.unwrap();
}

async fn server_recv(server: &MemoryConnection) -> Value {
    let bytes = server.recv().await.unwrap().expect("client sent a frame");
    serde_json::from_slice(&bytes).unwrap()
}

async fn next_message(signals: &mut mpsc::UnboundedReceiver<Signal>) -> Message {
    loop {
        match signals.recv().await.expect("signal stream ended") {
            Signal::Open => continue,
            Signal::Message(m) => return m,
            Signal::Close => panic!("unexpected close"),
        }
    }
}

fn join_request() -> Message {
    Message {
        action: Action::new("room", "join"),
        payload: json!({ "roomId": "r1" }),
    }
}

fn sound(id: &str) -> Value {
    json!({
        "action": { "handler": "client", "type": "push" },
        "payload": { "type": "SoundEffect", "soundId": id }
    })
}

// =========================================================================
// Game messages
// =========================================================================

#[tokio::test]
async fn test_game_messages_arrive_in_order() {
    let mut h = harness();
    push(&h.server, sound("one")).await;
    push(&h.server, sound("two")).await;

    assert_eq!(next_message(&mut h.signals).await.payload["soundId"], "one");
    assert_eq!(next_message(&mut h.signals).await.payload["soundId"], "two");
}

#[tokio::test]
async fn test_side_channel_frames_are_not_game_messages() {
    let mut h = harness();
    push(
        &h.server,
        json!({
            "action": { "handler": "room", "type": "error" },
            "payload": { "errorCode": "GAME_NOT_YOUR_TURN", "message": "no" }
        }),
    )
    .await;
    push(&h.server, sound("after")).await;

    let next = next_message(&mut h.signals).await;
    assert_eq!(next.payload["soundId"], "after");
    assert_eq!(*h.errors.lock().unwrap(), vec!["It is not your turn.".to_string()]);
}

#[tokio::test]
async fn test_disconnect_side_channel_updates_state() {
    let mut h = harness();
    let mut state = h.channel.side().subscribe();
    push(
        &h.server,
        json!({
            "action": { "handler": "room", "type": "disconnected" },
            "payload": { "roomWillClose": false, "player": "op" }
        }),
    )
    .await;
    push(&h.server, sound("sync-point")).await;
    next_message(&mut h.signals).await;

    state.changed().await.unwrap();
    assert_eq!(
        *state.borrow(),
        ConnectionState::WaitingReconnect { opponent: Some(PlayerId::from("op")) }
    );
}

// =========================================================================
// send
// =========================================================================

#[tokio::test]
async fn test_send_writes_json_frame() {
    let h = harness();
    let msg = Message::outgoing(ClientPayload::Choose {
        player: PlayerId::from("me"),
        prompt_id: PromptId::from("p1"),
        choice: vec!["b".into()],
    });
    h.channel.send(&msg).await;

    let frame = server_recv(&h.server).await;
    assert_eq!(frame["action"]["type"], "response");
    assert_eq!(frame["payload"]["promptId"], "p1");
    assert_eq!(frame["payload"]["choice"], json!(["b"]));
}

#[tokio::test]
async fn test_send_after_close_is_silent_noop() {
    let mut h = harness();
    h.channel.close().await;
    h.channel.send(&join_request()).await;

    assert!(!h.channel.is_open());
    assert!(h.server.recv().await.unwrap().is_none());
    assert_eq!(h.signals.recv().await, Some(Signal::Open));
    assert_eq!(h.signals.recv().await, Some(Signal::Close));
}

// =========================================================================
// request
// =========================================================================

#[tokio::test]
async fn test_request_matches_echoed_id() {
    let mut h = harness();
    let channel = h.channel.clone();
    let pending = tokio::spawn(async move { channel.request(&join_request()).await });

    let sent = server_recv(&h.server).await;
    let request_id = sent["payload"]["requestId"].as_str().unwrap().to_string();
    assert_eq!(sent["payload"]["roomId"], "r1");

    // A game message in between is not mistaken for the response.
    push(&h.server, sound("noise")).await;
    push(
        &h.server,
        json!({
            "action": { "handler": "room", "type": "join" },
            "payload": { "requestId": request_id, "joined": true }
        }),
    )
    .await;

    let response = pending.await.unwrap().unwrap();
    assert_eq!(response.payload["joined"], true);
    assert_eq!(next_message(&mut h.signals).await.payload["soundId"], "noise");
}

#[tokio::test]
async fn test_concurrent_requests_answered_out_of_order() {
    let h = harness();
    let first = {
        let channel = h.channel.clone();
        tokio::spawn(async move { channel.request(&join_request()).await })
    };
    let id_first = server_recv(&h.server).await["payload"]["requestId"].clone();
    let second = {
        let channel = h.channel.clone();
        tokio::spawn(async move { channel.request(&join_request()).await })
    };
    let id_second = server_recv(&h.server).await["payload"]["requestId"].clone();

    for (id, tag) in [(&id_second, "second"), (&id_first, "first")] {
        push(
            &h.server,
            json!({
                "action": { "handler": "room", "type": "join" },
                "payload": { "requestId": id, "tag": tag }
            }),
        )
        .await;
    }

    assert_eq!(first.await.unwrap().unwrap().payload["tag"], "first");
    assert_eq!(second.await.unwrap().unwrap().payload["tag"], "second");
}

#[tokio::test]
async fn test_response_without_known_id_goes_to_oldest_request() {
    let h = harness();
    let channel = h.channel.clone();
    let pending = tokio::spawn(async move { channel.request(&join_request()).await });
    server_recv(&h.server).await;

    push(
        &h.server,
        json!({
            "action": { "handler": "room", "type": "join" },
            "payload": { "requestId": "someone-else", "ok": 1 }
        }),
    )
    .await;

    assert_eq!(pending.await.unwrap().unwrap().payload["ok"], 1);
}

#[tokio::test]
async fn test_request_rejected_when_connection_closes() {
    let mut h = harness();
    let channel = h.channel.clone();
    let pending = tokio::spawn(async move { channel.request(&join_request()).await });
    server_recv(&h.server).await;

    h.server.close().await.unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Closed));
    assert_eq!(h.signals.recv().await, Some(Signal::Open));
    assert_eq!(h.signals.recv().await, Some(Signal::Close));
    assert_eq!(h.channel.side().state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_request_rejected_on_malformed_frame() {
    let h = harness();
    let channel = h.channel.clone();
    let pending = tokio::spawn(async move { channel.request(&join_request()).await });
    server_recv(&h.server).await;

    h.server.send(b"{ definitely not json").await.unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Malformed(_)));
    assert_eq!(
        *h.errors.lock().unwrap(),
        vec!["Received an invalid message.".to_string()]
    );
    // A bad frame doesn't end the session.
    assert!(h.channel.is_open());
}

#[tokio::test]
async fn test_request_when_closed_fails_fast() {
    let h = harness();
    h.channel.close().await;
    let err = h.channel.request(&join_request()).await.unwrap_err();
    assert!(matches!(err, SessionError::NotConnected));
}

#[tokio::test(start_paused = true)]
async fn test_request_times_out() {
    let h = harness_with(ChannelConfig {
        request_timeout: Duration::from_secs(3),
    });
    let err = h.channel.request(&join_request()).await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout(d) if d == Duration::from_secs(3)));

    // The request did go out; nobody answered it.
    assert!(server_recv(&h.server).await["payload"]["requestId"].is_string());
}
