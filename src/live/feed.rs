use std::convert::Infallible;

use axum::{
    debug_handler,
    extract::State,
    response::sse::{Event, Sse},
};
use futures_util::{Stream, StreamExt};

use crate::AppResult;

use super::Registry;

/// Server-sent event stream of [`super::LiveEvent`] envelopes. The client
/// disconnecting drops the stream, which closes the connection.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn events(
    State(registry): State<Registry>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let feed = registry.open()?;

    let stream = feed.into_stream().filter_map(|event| async move {
        match Event::default().json_data(&event) {
            Ok(frame) => Some(Ok(frame)),
            Err(err) => {
                tracing::error!("live event not encodable: {err}");
                None
            }
        }
    });

    Ok(Sse::new(stream))
}
