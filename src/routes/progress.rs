//! Progress push channel (SSE)
//!
//! A passive poller over the progress store: emits the current value every
//! 500 ms whether or not it changed, and closes right after 100. Nothing in
//! the render pipeline waits on this channel; a dropped subscriber only
//! tears down its own timer.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::state::AppState;

/// Reference cadence: at most 500 ms of staleness.
const POLL_PERIOD: Duration = Duration::from_millis(500);

/// Create the progress router
pub fn router() -> Router<AppState> {
    Router::new().route("/progress/:id", get(progress_sse))
}

#[derive(Serialize)]
struct ProgressEvent {
    progress: u8,
}

async fn progress_sse(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let stream = state
        .progress()
        .subscribe(id, POLL_PERIOD)
        .map(|progress| Event::default().json_data(&ProgressEvent { progress }));
    Sse::new(stream)
}
