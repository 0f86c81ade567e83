//! Server-Sent Events support

use super::types::{EntryView, SessionResponse};
use crate::runtime::{SessionEvent, SessionHandle, SessionSync};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{error::RecvError, Receiver};

/// Stream the session: an `init` snapshot, then every change. A subscriber
/// that falls behind gets a fresh `init` instead of the events it missed.
pub fn sse_stream(
    handle: SessionHandle,
    sync: SessionSync,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (init, events) = split_sync(&handle, sync);
    let state = StreamState {
        handle,
        pending_init: Some(init),
        events,
    };

    let events = stream::unfold(state, |mut state| async move {
        let (event_type, data) = state.next_payload().await?;
        Some((Ok(to_axum(event_type, &data)), state))
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

struct StreamState {
    handle: SessionHandle,
    pending_init: Option<SessionResponse>,
    events: Receiver<SessionEvent>,
}

impl StreamState {
    /// Next event to send; `None` once the session has stopped
    async fn next_payload(&mut self) -> Option<(&'static str, Value)> {
        if let Some(init) = self.pending_init.take() {
            return Some(init_payload(init));
        }

        match self.events.recv().await {
            Ok(event) => Some(session_event_payload(event)),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(
                    session_id = %self.handle.id(),
                    skipped,
                    "SSE subscriber lagged, resending snapshot"
                );
                let sync = self.handle.sync().await.ok()?;
                let (init, events) = split_sync(&self.handle, sync);
                self.events = events;
                Some(init_payload(init))
            }
            Err(RecvError::Closed) => None,
        }
    }
}

fn split_sync(
    handle: &SessionHandle,
    sync: SessionSync,
) -> (SessionResponse, Receiver<SessionEvent>) {
    let SessionSync {
        status,
        entries,
        events,
    } = sync;
    (SessionResponse::new(handle.id(), status, entries), events)
}

fn init_payload(session: SessionResponse) -> (&'static str, Value) {
    (
        "init",
        json!({
            "type": "init",
            "session": session,
        }),
    )
}

fn session_event_payload(event: SessionEvent) -> (&'static str, Value) {
    match event {
        SessionEvent::EntryAppended { entry } => (
            "entry_appended",
            json!({
                "type": "entry_appended",
                "entry": EntryView::from(entry),
            }),
        ),
        SessionEvent::EntryPatched { entry } => (
            "entry_patched",
            json!({
                "type": "entry_patched",
                "entry": EntryView::from(entry),
            }),
        ),
        SessionEvent::TimelineReset => ("timeline_reset", json!({ "type": "timeline_reset" })),
        SessionEvent::StateChange { state } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": state,
            }),
        ),
        SessionEvent::NavigateHome => ("navigate_home", json!({ "type": "navigate_home" })),
    }
}

fn to_axum(event_type: &str, data: &Value) -> Event {
    Event::default().event(event_type).data(data.to_string())
}
