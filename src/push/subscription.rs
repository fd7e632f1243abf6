use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{kv::SharedKv, messages::Message, ChatError};

use super::PushSender;

const KEY_PREFIX: &str = "push:subscription:";

/// Subscription descriptor as produced by the browser's `PushManager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<i64>,
    #[serde(default)]
    pub keys: Option<PushKeys>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    pub data: NotificationData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
}

impl PushNotification {
    pub fn for_message(message: &Message) -> PushNotification {
        PushNotification {
            title: message.sender_name.clone().unwrap_or_else(|| "New message".to_owned()),
            body: message.text.clone(),
            icon: message.sender_avatar.clone(),
            badge: None,
            data: NotificationData { url: "/chat".to_owned() },
        }
    }
}

/// Outcome counts of one [`PushRegistry::notify_all`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PushReport {
    pub delivered: usize,
    /// Gone subscriptions deleted from the store.
    pub removed: usize,
    pub failed: usize,
    /// Entries that could not be read or parsed.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct PushRegistry {
    kv: SharedKv,
    sender: Arc<dyn PushSender>,
}

impl PushRegistry {
    pub fn new(kv: SharedKv, sender: Arc<dyn PushSender>) -> PushRegistry {
        PushRegistry { kv, sender }
    }

    fn key(endpoint: &str) -> String {
        format!("{KEY_PREFIX}{endpoint}")
    }

    pub async fn subscribe(&self, subscription: &PushSubscription) -> Result<(), ChatError> {
        if subscription.endpoint.trim().is_empty() {
            return Err(ChatError::InvalidInput("push subscription endpoint is required"));
        }
        let Some(kv) = &self.kv else {
            return Err(ChatError::StorageUnavailable("no durable store configured".to_owned()));
        };

        let key = Self::key(&subscription.endpoint);
        kv.set(&key, &serde_json::to_string(subscription)?).await?;
        tracing::info!(%key, "push subscription saved");
        Ok(())
    }

    pub async fn unsubscribe(&self, endpoint: &str) -> Result<bool, ChatError> {
        let Some(kv) = &self.kv else {
            return Err(ChatError::StorageUnavailable("no durable store configured".to_owned()));
        };
        kv.delete(&Self::key(endpoint)).await
    }

    /// Sends `notification` to every stored subscription, one at a time.
    /// Failures stay with their subscription; gone ones are deleted.
    pub async fn notify_all(&self, notification: &PushNotification) -> PushReport {
        let mut report = PushReport::default();
        let Some(kv) = &self.kv else {
            return report;
        };

        let keys = match kv.list_keys(KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!("push fan-out skipped: {err}");
                return report;
            }
        };

        for key in keys {
            let subscription = match kv.get(&key).await {
                Ok(Some(raw)) => match serde_json::from_str::<PushSubscription>(&raw) {
                    Ok(subscription) => subscription,
                    Err(err) => {
                        tracing::debug!(%key, "unreadable push subscription: {err}");
                        report.skipped += 1;
                        continue;
                    }
                },
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(%key, "{err}");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.sender.send(&subscription, notification).await {
                Ok(()) => report.delivered += 1,
                Err(ChatError::SubscriptionGone) => {
                    if let Err(err) = kv.delete(&key).await {
                        tracing::warn!(%key, "could not delete gone subscription: {err}");
                    }
                    tracing::info!(%key, "push subscription gone, removed");
                    report.removed += 1;
                }
                Err(err) => {
                    tracing::warn!(%key, "push delivery failed: {err}");
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(?report, "push fan-out done");
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::kv::{KvStore, SqliteKv};

    /// Endpoints containing "gone" answer gone, "flaky" fail, others succeed.
    #[derive(Default)]
    struct FakeSender {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PushSender for FakeSender {
        async fn send(&self, subscription: &PushSubscription, _: &PushNotification) -> Result<(), ChatError> {
            self.calls.lock().unwrap().push(subscription.endpoint.clone());
            if subscription.endpoint.contains("gone") {
                Err(ChatError::SubscriptionGone)
            } else if subscription.endpoint.contains("flaky") {
                Err(ChatError::DeliveryFailure("503".to_owned()))
            } else {
                Ok(())
            }
        }
    }

    fn subscription(endpoint: &str) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.to_owned(),
            expiration_time: None,
            keys: Some(PushKeys { p256dh: "p".to_owned(), auth: "a".to_owned() }),
        }
    }

    fn notification() -> PushNotification {
        let message = crate::messages::NewMessage::text("hi").sent_by("alice").into_message(0).unwrap();
        PushNotification::for_message(&message)
    }

    async fn setup() -> (PushRegistry, Arc<SqliteKv>, Arc<FakeSender>) {
        let kv = Arc::new(SqliteKv::connect("sqlite::memory:").await.unwrap());
        let sender = Arc::new(FakeSender::default());
        (PushRegistry::new(Some(kv.clone()), sender.clone()), kv, sender)
    }

    #[tokio::test]
    async fn gone_subscription_is_removed_and_not_retried() {
        let (push, kv, sender) = setup().await;
        push.subscribe(&subscription("https://push/ok")).await.unwrap();
        push.subscribe(&subscription("https://push/gone")).await.unwrap();
        push.subscribe(&subscription("https://push/flaky")).await.unwrap();

        let report = push.notify_all(&notification()).await;
        assert_eq!(report, PushReport { delivered: 1, removed: 1, failed: 1, skipped: 0 });
        assert_eq!(kv.get("push:subscription:https://push/gone").await.unwrap(), None);

        sender.calls.lock().unwrap().clear();
        let report = push.notify_all(&notification()).await;
        assert_eq!(report.removed, 0);
        assert_eq!(
            *sender.calls.lock().unwrap(),
            vec!["https://push/flaky", "https://push/ok"]
        );
    }

    #[tokio::test]
    async fn malformed_entries_are_skipped() {
        let (push, kv, sender) = setup().await;
        kv.set("push:subscription:broken", "{").await.unwrap();
        push.subscribe(&subscription("https://push/ok")).await.unwrap();

        let report = push.notify_all(&notification()).await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(sender.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resubscribing_overwrites() {
        let (push, kv, _) = setup().await;
        push.subscribe(&subscription("https://push/a")).await.unwrap();
        push.subscribe(&subscription("https://push/a")).await.unwrap();

        assert_eq!(kv.list_keys("push:subscription:").await.unwrap().len(), 1);
        assert!(push.unsubscribe("https://push/a").await.unwrap());
        assert!(!push.unsubscribe("https://push/a").await.unwrap());
    }

    #[tokio::test]
    async fn blank_endpoint_is_invalid() {
        let (push, _, _) = setup().await;
        let err = push.subscribe(&subscription("  ")).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn without_a_store_nothing_is_sent() {
        let sender = Arc::new(FakeSender::default());
        let push = PushRegistry::new(None, sender.clone());

        assert!(matches!(
            push.subscribe(&subscription("https://push/a")).await,
            Err(ChatError::StorageUnavailable(_))
        ));
        assert_eq!(push.notify_all(&notification()).await, PushReport::default());
        assert!(sender.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn notification_from_message() {
        let n = notification();
        assert_eq!(n.title, "alice");
        assert_eq!(n.body, "hi");
        assert_eq!(n.data.url, "/chat");
        let json = serde_json::to_value(&n).unwrap();
        assert!(json.get("icon").is_none());
    }
}
