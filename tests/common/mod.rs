#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use pingroom::{
    app, auth::Clients,
    kv::{KvStore, SharedKv, SqliteKv},
    push::{PushNotification, PushSender, PushSubscription},
    AppState, ChatError, Config,
};

/// A durable store that is always unreachable.
pub struct DownKv;

fn down<T>() -> Result<T, ChatError> {
    Err(ChatError::StorageUnavailable("connection refused".to_owned()))
}

#[async_trait]
impl KvStore for DownKv {
    async fn get(&self, _: &str) -> Result<Option<String>, ChatError> { down() }
    async fn set(&self, _: &str, _: &str) -> Result<(), ChatError> { down() }
    async fn delete(&self, _: &str) -> Result<bool, ChatError> { down() }
    async fn list_keys(&self, _: &str) -> Result<Vec<String>, ChatError> { down() }
    async fn list_append(&self, _: &str, _: &str) -> Result<usize, ChatError> { down() }
    async fn list_trim(&self, _: &str, _: i64, _: i64) -> Result<(), ChatError> { down() }
    async fn list_range(&self, _: &str, _: i64, _: i64) -> Result<Vec<String>, ChatError> { down() }
}

/// Records every delivery; endpoints containing "gone" report the subscription gone.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, PushNotification)>>,
}

impl RecordingSender {
    pub fn endpoints(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(endpoint, _)| endpoint.clone()).collect()
    }
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send(&self, subscription: &PushSubscription, notification: &PushNotification) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push((subscription.endpoint.clone(), notification.clone()));
        if subscription.endpoint.contains("gone") {
            return Err(ChatError::SubscriptionGone);
        }
        Ok(())
    }
}

pub async fn sqlite_kv() -> Arc<SqliteKv> {
    Arc::new(SqliteKv::connect("sqlite::memory:").await.unwrap())
}

pub fn state(kv: SharedKv, sender: Arc<RecordingSender>) -> AppState {
    let config = Config {
        vapid_public_key: Some("BPubKey".to_owned()),
        ..Config::default()
    };
    AppState::new(config, kv, Clients::none(), sender)
}

pub fn server(app_state: AppState) -> TestServer {
    TestServer::builder()
        .save_cookies()
        .build(app(app_state))
        .unwrap()
}
