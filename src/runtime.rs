//! Session runtime
//!
//! Each session runs as its own actor task. Handles send commands to it;
//! backend calls run on spawned tasks and report back as events, so the
//! actor is the single point that mutates the session's timeline.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::contexts::ContextTable;
use crate::llm::{AspectRatio, Backends};
use crate::locale::Locale;
use crate::state_machine::{ConvState, SessionContext};
use crate::timeline::{Entry, TimelineStore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};

/// Events published to session subscribers
#[derive(Debug, Clone)]
pub enum SessionEvent {
    EntryAppended { entry: Entry },
    EntryPatched { entry: Entry },
    TimelineReset,
    StateChange { state: ConvState },
    NavigateHome,
}

/// How a submission was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// A turn was started
    Accepted,
    /// Blank input
    Ignored,
    /// A reply is still being generated
    Busy,
    /// The input was a navigation keyword; nothing was recorded
    NavigateHome,
}

/// Controller state plus the settings it runs under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub state: ConvState,
    pub context_id: String,
    pub locale: Locale,
}

/// A consistent view of a session plus a subscription starting right after it
#[derive(Debug)]
pub struct SessionSync {
    pub status: SessionStatus,
    pub entries: Vec<Entry>,
    pub events: broadcast::Receiver<SessionEvent>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session {0} is no longer running")]
    Closed(String),
}

/// Commands sent from handles to the session actor
#[derive(Debug)]
pub(crate) enum Command {
    Submit {
        text: String,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    Open {
        context_id: String,
        locale: Option<Locale>,
        reply: oneshot::Sender<String>,
    },
    SetLocale {
        locale: Locale,
        reply: oneshot::Sender<()>,
    },
    Sync {
        reply: oneshot::Sender<SessionSync>,
    },
}

/// Cheap, cloneable handle to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    command_tx: mpsc::Sender<Command>,
    timeline: TimelineStore,
    status_rx: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Submit user input. Returns once the input has been recorded (or
    /// rejected); the reply arrives later through the timeline.
    pub async fn submit(&self, text: impl Into<String>) -> Result<SubmitOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Submit {
            text: text.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.closed())
    }

    /// Reset the timeline to the opening of `context_id`, optionally
    /// switching locale first. Returns the context id actually opened.
    pub async fn open(
        &self,
        context_id: impl Into<String>,
        locale: Option<Locale>,
    ) -> Result<String, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Open {
            context_id: context_id.into(),
            locale,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.closed())
    }

    /// Switch locale for subsequent turns; the timeline is kept.
    pub async fn set_locale(&self, locale: Locale) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetLocale { locale, reply }).await?;
        rx.await.map_err(|_| self.closed())
    }

    pub fn snapshot(&self) -> Vec<Entry> {
        self.timeline.snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    /// Snapshot the session and subscribe to its events in one step, so
    /// every later change arrives as an event and none is in both.
    pub async fn sync(&self) -> Result<SessionSync, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Sync { reply }).await?;
        rx.await.map_err(|_| self.closed())
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| self.closed())
    }

    fn closed(&self) -> SessionError {
        SessionError::Closed(self.id.clone())
    }
}

/// Manager for all live sessions
pub struct SessionManager {
    backends: Backends,
    contexts: Arc<ContextTable>,
    aspect_ratio: AspectRatio,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(backends: Backends, contexts: Arc<ContextTable>, aspect_ratio: AspectRatio) -> Self {
        Self {
            backends,
            contexts,
            aspect_ratio,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn contexts(&self) -> &ContextTable {
        &self.contexts
    }

    /// Start a session and open `context_id` in it
    pub async fn create(
        &self,
        context_id: &str,
        locale: Locale,
    ) -> Result<SessionHandle, SessionError> {
        let id = uuid::Uuid::new_v4().to_string();
        let handle = SessionRuntime::spawn(
            SessionContext::new(id.clone(), locale, self.aspect_ratio),
            self.contexts.clone(),
            self.backends.text.clone(),
            self.backends.image.clone(),
        );
        handle.open(context_id, None).await?;

        let active = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(id.clone(), handle.clone());
            sessions.len()
        };
        tracing::info!(session_id = %id, context = %context_id, %locale, active, "Session created");
        Ok(handle)
    }

    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Forget a session. Its actor stops once the last handle is dropped and
    /// in-flight backend calls have reported back.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session removed");
        }
        removed
    }
}
