use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use bytes::Bytes;
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use crate::config::SSE_KEEPALIVE_SECS;
use crate::state::AppState;

/// Stream chart events. Each client first gets a `state` frame describing the
/// current map, then every `ready` / `error` / `select` event as it happens.
pub async fn map_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        // Subscribe before taking the snapshot so nothing published in between is lost.
        let rx = state.event_tx.subscribe();
        if let Some(event) = state_event(&state).await {
            yield Ok(event);
        }

        let mut stream = BroadcastStream::new(rx);
        while let Some(result) = stream.next().await {
            match result {
                Ok(event) => {
                    let Some(payload) = event_payload(event.json.as_ref()) else {
                        warn!(
                            seq = event.seq,
                            event = event.kind,
                            "event payload is not valid utf-8; dropping SSE event"
                        );
                        continue;
                    };
                    yield Ok(
                        Event::default()
                            .id(event.seq.to_string())
                            .event(event.kind)
                            .data(payload),
                    );
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "SSE client lagged behind broadcast buffer; replaying state"
                    );
                    if let Some(event) = state_event(&state).await {
                        yield Ok(event);
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}

async fn state_event(state: &AppState) -> Option<Event> {
    let view = state.state_view().await;
    match serde_json::to_string(&view) {
        Ok(payload) => Some(
            Event::default()
                .id(view.seq.to_string())
                .event("state")
                .data(payload),
        ),
        Err(e) => {
            warn!(error = %e, "failed to serialize map state; skipping SSE state event");
            None
        }
    }
}

fn event_payload(bytes: &Bytes) -> Option<&str> {
    std::str::from_utf8(bytes.as_ref()).ok()
}
