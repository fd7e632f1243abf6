use axum::{debug_handler, extract::Query, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{session::{Identity, USER}, AppResult};

#[derive(Deserialize)]
pub(crate) struct LogoutQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler]
pub(crate) async fn logout(
    Query(LogoutQuery { return_url }): Query<LogoutQuery>,
    session: Session
) -> AppResult<Redirect> {
    if let Some(identity) = session.get::<Identity>(USER).await? {
        tracing::info!(user = %identity.id, "logged out");
    }
    session.flush().await?;
    Ok(Redirect::to(return_url.as_deref().unwrap_or("/")))
}
