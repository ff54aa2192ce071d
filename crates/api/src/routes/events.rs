//! Server-sent event stream.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::{Stream, StreamExt};

use crate::middleware::OptionalUser;
use crate::state::AppState;

/// GET /api/events
///
/// Everyone gets global events; signed-in users also get their own room.
pub async fn stream(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = state.events().subscribe(user.map(|u| u.id)).map(|event| {
        let json = serde_json::to_string(&event.kind)
            .unwrap_or_else(|_| r#"{"type":"error"}"#.to_string());
        Ok(Event::default().event(event.kind.name()).data(json))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
