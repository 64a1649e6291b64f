use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::AppState;

/// Stream of assessment activity for the dashboard.
pub async fn assessment_events(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).map(|result| {
        let event = match result {
            Ok(evt) => Event::default()
                .event(evt.name())
                .data(serde_json::to_string(&evt).unwrap_or_default()),
            Err(_) => Event::default().comment("missed event"),
        };
        Ok(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
