mod event;
mod feed;
mod registry;

use axum::{routing::get, Router};

use crate::AppState;

pub use event::LiveEvent;
pub use registry::{Handle, LiveFeed, Registry, OUTBOX};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(feed::events))
}
