use std::sync::Arc;

use pingroom::{app, auth, kv::{SharedKv, SqliteKv}, push::HttpPushSender, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let kv = load_kv(&config).await;
    let clients = auth::Clients::from_config(&config).map_err(|err| err.error)?;

    let push_sender = Arc::new(HttpPushSender::new(reqwest::Client::new()));
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config, kv, clients, push_sender);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, app(app_state)).await?;
    Ok(())
}

/// Opens the durable store, or `None` to run with in-memory history only.
async fn load_kv(config: &Config) -> SharedKv {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, history is kept in memory only and push is disabled");
        return None;
    };

    match SqliteKv::connect(url).await {
        Ok(kv) => {
            tracing::info!("durable store ready");
            Some(Arc::new(kv))
        }
        Err(err) => {
            tracing::error!("durable store unavailable, continuing without it: {err}");
            None
        }
    }
}
