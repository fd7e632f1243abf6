mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use pingroom::kv::KvStore;
use serde_json::{json, Value};

use common::{server, sqlite_kv, state};

#[tokio::test]
async fn guest_entry_sets_the_session_identity() {
    let kv = sqlite_kv().await;
    let server = server(state(Some(kv.clone()), Arc::default()));

    let me: Value = server.get("/api/me").await.json();
    assert_eq!(me, Value::Null);

    let identity: Value = server.post("/guest").json(&json!({ "name": "  " })).await.json();
    let name = identity["name"].as_str().unwrap();
    assert_eq!(name.split(' ').count(), 2);
    let id = identity["id"].as_str().unwrap();
    assert!(id.starts_with("guest-"));

    let me: Value = server.get("/api/me").await.json();
    assert_eq!(me, identity);
    assert!(kv.get(&format!("user:{id}")).await.unwrap().is_some());
}

#[tokio::test]
async fn messages_inherit_the_session_identity() {
    let server = server(state(None, Arc::default()));

    let identity: Value = server
        .post("/guest")
        .json(&json!({ "name": "carol", "avatar": "https://a/carol.png" }))
        .await
        .json();

    let body: Value = server.post("/api/messages").json(&json!({ "text": "hi" })).await.json();

    assert_eq!(body["message"]["senderId"], identity["id"]);
    assert_eq!(body["message"]["senderName"], "carol");
    assert_eq!(body["message"]["senderAvatar"], "https://a/carol.png");
}

#[tokio::test]
async fn logout_clears_the_session() {
    let server = server(state(None, Arc::default()));
    server.post("/guest").json(&json!({ "name": "dave" })).await.assert_status_ok();

    let response = server.get("/logout").await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

    let me: Value = server.get("/api/me").await.json();
    assert_eq!(me, Value::Null);
}

#[tokio::test]
async fn login_without_provider_keys_fails() {
    let server = server(state(None, Arc::default()));

    let response = server.get("/login/github").await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}
