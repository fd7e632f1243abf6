use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{kv::SharedKv, session::{Identity, USER}, AppResult};

use super::{guest_alias, save_user};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GuestRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

/// Enters the room without a provider login. A blank name gets a random alias.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn guest(
    State(kv): State<SharedKv>,
    session: Session,
    Json(GuestRequest { name, avatar }): Json<GuestRequest>,
) -> AppResult<Json<Identity>> {
    let name = name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(guest_alias);

    let identity = Identity {
        id: format!("guest-{}", Uuid::now_v7().simple()),
        name: Some(name),
        avatar: avatar.filter(|avatar| !avatar.trim().is_empty()),
    };

    session.cycle_id().await?;
    session.insert(USER, &identity).await?;
    save_user(&kv, &identity).await;

    tracing::info!(user = %identity.id, "guest entered");
    Ok(Json(identity))
}

#[debug_handler]
pub(crate) async fn me(session: Session) -> AppResult<Json<Option<Identity>>> {
    Ok(Json(session.get::<Identity>(USER).await?))
}
