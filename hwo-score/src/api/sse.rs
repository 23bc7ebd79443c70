//! Service event stream

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events - SSE stream of service events
///
/// Streams `ParamsPublished`, `ModelsReloaded` and `BatchCompleted`.
pub async fn event_stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    hwo_common::sse::event_bus_sse_stream("hwo-score", &state.event_bus)
}
