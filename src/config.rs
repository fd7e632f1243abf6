use std::time::Duration;

use anyhow::Context;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub public_url: String,
    /// SQLite url for the durable key-value store. `None` runs in degraded mode.
    pub database_url: Option<String>,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
    pub vapid_public_key: Option<String>,
    pub heartbeat: Duration,
    pub session_idle: time::Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_owned(),
            public_url: "http://localhost:8080".to_owned(),
            database_url: None,
            github_client_id: None,
            github_client_secret: None,
            vapid_public_key: None,
            heartbeat: Duration::from_secs(30),
            session_idle: time::Duration::minutes(60),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        let defaults = Config::default();

        let heartbeat = heartbeat_period(var("HEARTBEAT_SECS"), defaults.heartbeat)?;
        let session_idle = match var("SESSION_IDLE_MINUTES") {
            Some(minutes) => time::Duration::minutes(minutes.parse().context("SESSION_IDLE_MINUTES")?),
            None => defaults.session_idle,
        };

        Ok(Config {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            public_url: var("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.public_url),
            database_url: var("DATABASE_URL"),
            github_client_id: var("GITHUB_CLIENT_ID"),
            github_client_secret: var("GITHUB_CLIENT_SECRET"),
            vapid_public_key: var("VAPID_PUBLIC_KEY"),
            heartbeat,
            session_idle,
        })
    }
}

fn heartbeat_period(secs: Option<String>, default: Duration) -> anyhow::Result<Duration> {
    let Some(secs) = secs else {
        return Ok(default);
    };
    let secs: u64 = secs.trim().parse().context("HEARTBEAT_SECS")?;
    anyhow::ensure!(secs > 0, "HEARTBEAT_SECS must be at least 1");
    Ok(Duration::from_secs(secs))
}

fn var(key: &str) -> Option<String> {
    dotenv::var(key).ok().filter(|value| !value.trim().is_empty())
}
