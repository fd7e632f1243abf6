use async_trait::async_trait;
use reqwest::StatusCode;

use crate::ChatError;

use super::{PushNotification, PushSubscription};

/// Delivers one notification to one subscription.
///
/// Implementations return [`ChatError::SubscriptionGone`] when the push
/// service says the subscription no longer exists, and
/// [`ChatError::DeliveryFailure`] for anything that may be transient.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, notification: &PushNotification) -> Result<(), ChatError>;
}

/// Posts the JSON notification straight to the subscription endpoint.
///
/// Payloads are not encrypted and requests carry no VAPID signature, so this
/// suits push relays and gateways that accept plain JSON.
#[derive(Clone, Default)]
pub struct HttpPushSender {
    http_client: reqwest::Client,
}

impl HttpPushSender {
    pub fn new(http_client: reqwest::Client) -> HttpPushSender {
        HttpPushSender { http_client }
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(&self, subscription: &PushSubscription, notification: &PushNotification) -> Result<(), ChatError> {
        let response = self.http_client
            .post(&subscription.endpoint)
            .header("TTL", "60")
            .header("Urgency", "normal")
            .json(notification)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(ChatError::SubscriptionGone),
            status if status.is_success() => Ok(()),
            status => Err(ChatError::DeliveryFailure(format!("{} answered {status}", subscription.endpoint))),
        }
    }
}
