mod handlers;
mod sender;
mod subscription;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use sender::{HttpPushSender, PushSender};
pub use subscription::{NotificationData, PushKeys, PushNotification, PushRegistry, PushReport, PushSubscription};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(handlers::subscribe))
        .route("/unsubscribe", post(handlers::unsubscribe))
        .route("/public-key", get(handlers::public_key))
}
