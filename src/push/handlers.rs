use std::sync::Arc;

use axum::{debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Deserialize;
use serde_json::json;

use crate::{AppResult, ChatError, Config};

use super::{PushRegistry, PushSubscription};

#[derive(Deserialize)]
pub(crate) struct UnsubscribeRequest {
    endpoint: String,
}

/// A storage outage is logged and still answered with success; the browser
/// keeps its subscription and may re-register later.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn subscribe(
    State(push): State<PushRegistry>,
    Json(subscription): Json<PushSubscription>,
) -> AppResult<Response> {
    match push.subscribe(&subscription).await {
        Ok(()) => {}
        Err(ChatError::StorageUnavailable(err)) => {
            tracing::warn!(endpoint = %subscription.endpoint, "push subscription not saved: {err}");
        }
        Err(err) => return Err(err.into()),
    }

    Ok(Json(json!({ "success": true })).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn unsubscribe(
    State(push): State<PushRegistry>,
    Json(UnsubscribeRequest { endpoint }): Json<UnsubscribeRequest>,
) -> AppResult<Response> {
    let removed = match push.unsubscribe(&endpoint).await {
        Ok(removed) => removed,
        Err(err) => {
            tracing::warn!(%endpoint, "push subscription not removed: {err}");
            false
        }
    };

    Ok(Json(json!({ "success": true, "removed": removed })).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn public_key(
    State(config): State<Arc<Config>>,
) -> Response {
    match &config.vapid_public_key {
        Some(key) => Json(json!({ "publicKey": key })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "push is not configured" }))).into_response(),
    }
}
