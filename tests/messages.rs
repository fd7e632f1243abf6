mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use pingroom::{live::LiveEvent, messages::{Message, RETENTION}};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::{server, sqlite_kv, state, DownKv, RecordingSender};

#[tokio::test]
async fn submit_returns_the_stored_message() {
    let kv = sqlite_kv().await;
    let server = server(state(Some(kv), Arc::default()));

    let response = server
        .post("/api/messages")
        .json(&json!({ "text": "hello", "senderName": "alice" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"]["text"], "hello");
    assert_eq!(body["message"]["senderName"], "alice");
    assert_eq!(body["message"]["senderId"], "alice");
    assert_eq!(body["message"]["isOwn"], false);
    assert!(body["message"]["id"].is_string());
}

#[tokio::test]
async fn blank_text_is_a_client_error() {
    let server = server(state(Some(sqlite_kv().await), Arc::default()));

    for text in [json!(""), json!("   "), Value::Null] {
        let response = server
            .post("/api/messages")
            .json(&json!({ "text": text, "senderName": "alice" }))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>(), json!({ "error": "Message text is required" }));
    }

    let history: Value = server.get("/api/messages").await.json();
    assert_eq!(history, json!({ "messages": [] }));
}

#[tokio::test]
async fn live_subscriber_receives_the_submitted_message() {
    let app_state = state(Some(sqlite_kv().await), Arc::default());
    let mut feed = app_state.registry.open().unwrap();
    assert!(matches!(feed.recv().await, Some(LiveEvent::Connected { .. })));

    let server = server(app_state);
    let body: Value = server
        .post("/api/messages")
        .json(&json!({ "text": "hello", "senderName": "alice" }))
        .await
        .json();
    let sent: Message = serde_json::from_value(body["message"].clone()).unwrap();

    match feed.recv().await {
        Some(LiveEvent::NewMessage { message }) => assert_eq!(message, sent),
        other => panic!("expected new_message, got {other:?}"),
    }
}

#[tokio::test]
async fn history_is_ascending_and_bounded() {
    let server = server(state(Some(sqlite_kv().await), Arc::default()));

    for i in 0..=RETENTION {
        server
            .post("/api/messages")
            .json(&json!({ "text": format!("m{i}"), "senderName": "bot" }))
            .await
            .assert_status_ok();
    }

    let history: Value = server.get("/api/messages").await.json();
    let messages: Vec<Message> = serde_json::from_value(history["messages"].clone()).unwrap();
    assert_eq!(messages.len(), RETENTION);
    assert_eq!(messages[0].text, "m1");
    assert_eq!(messages[RETENTION - 1].text, format!("m{RETENTION}"));
    assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let page: Value = server.get("/api/messages").add_query_param("limit", 3).await.json();
    let texts: Vec<&str> = page["messages"].as_array().unwrap().iter().map(|m| m["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec![format!("m{}", RETENTION - 2), format!("m{}", RETENTION - 1), format!("m{RETENTION}")]);
}

#[tokio::test]
async fn storage_outage_degrades_to_memory() {
    let server = server(state(Some(Arc::new(DownKv)), Arc::new(RecordingSender::default())));

    let response = server
        .post("/api/messages")
        .json(&json!({ "text": "still up", "senderName": "alice" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let id = response.json::<Value>()["message"]["id"].clone();

    let history: Value = server.get("/api/messages").await.json();
    assert_eq!(history["messages"].as_array().unwrap().len(), 1);
    assert_eq!(history["messages"][0]["id"], id);
}

#[tokio::test]
async fn bot_messages_use_the_bot_identity() {
    let server = server(state(None, Arc::default()));

    let body: Value = server
        .post("/api/messages")
        .json(&json!({ "text": "beep", "userName": "alice", "isBot": true }))
        .await
        .json();

    assert_eq!(body["message"]["senderId"], "bot");
    assert_eq!(body["message"]["senderName"], "Bot");
}
