pub mod appresult;
pub mod auth;
pub mod config;
pub mod error;
pub mod kv;
pub mod live;
pub mod messages;
pub mod push;
pub mod session;

use std::sync::Arc;

use axum::{extract::FromRef, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};
pub use config::Config;
pub use error::ChatError;

use kv::SharedKv;
use live::Registry;
use messages::MessageStore;
use push::{PushRegistry, PushSender};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: MessageStore,
    pub registry: Registry,
    pub push: PushRegistry,
    pub kv: SharedKv,
    pub clients: auth::Clients,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, kv: SharedKv, clients: auth::Clients, push_sender: Arc<dyn PushSender>) -> AppState {
        AppState {
            store: MessageStore::new(kv.clone()),
            registry: Registry::new(config.heartbeat),
            push: PushRegistry::new(kv.clone(), push_sender),
            kv,
            clients,
            config: Arc::new(config),
        }
    }
}

pub fn app(app_state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(app_state.config.public_url.starts_with("https://"))
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(app_state.config.session_idle));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(auth::router())
        .nest("/api/messages", messages::router())
        .nest("/api/events", live::router())
        .nest("/api/push", push::router())

        .with_state(app_state)
        .layer(session_layer)
        .layer(cors)
}
