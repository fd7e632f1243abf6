use axum::{routing::{get, post}, Router};
use rand::seq::IndexedRandom;

use crate::{kv::SharedKv, session::Identity, AppState};

mod clients;
mod guest;
mod lockin;
mod login;
mod logout;

pub use clients::{ClientProvider, Clients};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/logout", get(logout::logout))
        .route("/guest", post(guest::guest))
        .route("/api/me", get(guest::me))
}

/// Mirrors the identity to `user:{id}`. Best effort: login never fails on it.
pub(crate) async fn save_user(kv: &SharedKv, identity: &Identity) {
    let Some(kv) = kv else {
        return;
    };

    let saved = match serde_json::to_string(identity) {
        Ok(json) => kv.set(&format!("user:{}", identity.id), &json).await,
        Err(err) => Err(err.into()),
    };
    if let Err(err) = saved {
        tracing::warn!(user = %identity.id, "user not saved: {err}");
    }
}

pub(crate) fn guest_alias() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy", "Sad",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    format!(
        "{} {}",
        adjectives.choose(&mut rng).unwrap_or(&"Quiet"),
        nouns.choose(&mut rng).unwrap_or(&"Guest"),
    )
}
