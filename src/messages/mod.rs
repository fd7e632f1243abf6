mod history;
mod model;
mod store;
mod submit;

use axum::{routing::get, Router};

use crate::AppState;

pub use model::{Message, NewMessage};
pub use store::{MessageStore, RETENTION};
pub(crate) use store::now_millis;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(history::history).post(submit::submit))
}
