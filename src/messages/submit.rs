use axum::{debug_handler, extract::State, Json};
use serde::Serialize;
use tower_sessions::Session;

use crate::{
    live::Registry,
    push::{PushNotification, PushRegistry},
    session::{Identity, USER},
    AppResult,
};

use super::{Message, MessageStore, NewMessage};

#[derive(Serialize)]
pub(crate) struct Submitted {
    message: Message,
}

/// Stores the message, pushes it to every live feed, then fans out web push
/// notifications in the background. The returned message carries the
/// server-assigned id clients use to reconcile their optimistic copy.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn submit(
    State(store): State<MessageStore>,
    State(registry): State<Registry>,
    State(push): State<PushRegistry>,
    session: Session,
    Json(candidate): Json<NewMessage>,
) -> AppResult<Json<Submitted>> {
    let identity = session.get::<Identity>(USER).await?;
    let message = store.append(candidate.with_identity(identity)).await?;

    registry.broadcast(&message);

    let notification = PushNotification::for_message(&message);
    tokio::spawn(async move {
        push.notify_all(&notification).await;
    });

    Ok(Json(Submitted { message }))
}
