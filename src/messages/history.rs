use axum::{debug_handler, extract::{Query, State}, Json};
use serde::{Deserialize, Serialize};

use super::{Message, MessageStore};

#[derive(Deserialize)]
pub(crate) struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
pub(crate) struct History {
    messages: Vec<Message>,
}

/// Never fails: a storage outage yields whatever the in-memory log holds.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn history(
    Query(HistoryQuery { limit }): Query<HistoryQuery>,
    State(store): State<MessageStore>,
) -> Json<History> {
    Json(History {
        messages: store.recent(limit).await,
    })
}
