//! Session runtime executor

use super::traits::{ImageBackend, TextBackend};
use super::{Command, SessionEvent, SessionHandle, SessionStatus, SessionSync, SubmitOutcome};

use crate::contexts::ContextTable;
use crate::llm::HistoryMessage;
use crate::state_machine::{
    transition, ConvState, Effect, Event, SessionContext, TransitionError, TransitionResult,
    TurnId,
};
use crate::timeline::{EntryDraft, TimelineError, TimelineStore};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;
const BROADCAST_BUFFER: usize = 256;

/// Actor owning one session's state and timeline
pub struct SessionRuntime<T, I>
where
    T: TextBackend + ?Sized + 'static,
    I: ImageBackend + ?Sized + 'static,
{
    context: SessionContext,
    state: ConvState,
    timeline: TimelineStore,
    contexts: Arc<ContextTable>,
    text: Arc<T>,
    image: Arc<I>,
    next_turn: TurnId,
    /// Backend tasks that have not reported back yet
    in_flight: usize,
    command_rx: mpsc::Receiver<Command>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    status_tx: watch::Sender<SessionStatus>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl<T, I> SessionRuntime<T, I>
where
    T: TextBackend + ?Sized + 'static,
    I: ImageBackend + ?Sized + 'static,
{
    /// Build the actor and a handle to it; nothing runs until `run`
    pub fn new(
        context: SessionContext,
        contexts: Arc<ContextTable>,
        text: Arc<T>,
        image: Arc<I>,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_BUFFER);
        let timeline = TimelineStore::new();

        let state = ConvState::Idle;
        let (status_tx, status_rx) = watch::channel(SessionStatus {
            state: state.clone(),
            context_id: context.context_id.clone(),
            locale: context.locale,
        });

        let handle = SessionHandle {
            id: context.session_id.clone(),
            command_tx,
            timeline: timeline.clone(),
            status_rx,
        };

        let runtime = Self {
            context,
            state,
            timeline,
            contexts,
            text,
            image,
            next_turn: TurnId(0),
            in_flight: 0,
            command_rx,
            event_rx,
            event_tx,
            status_tx,
            broadcast_tx,
        };
        (runtime, handle)
    }

    /// Start the actor on the tokio runtime and return a handle to it
    pub fn spawn(
        context: SessionContext,
        contexts: Arc<ContextTable>,
        text: Arc<T>,
        image: Arc<I>,
    ) -> SessionHandle {
        let (runtime, handle) = Self::new(context, contexts, text, image);
        tokio::spawn(runtime.run());
        handle
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        let mut commands_open = true;
        // Keep going after the last handle is dropped until in-flight
        // backend calls have reported back.
        while commands_open || self.in_flight > 0 {
            tokio::select! {
                command = self.command_rx.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command),
                    None => commands_open = false,
                },
                Some(event) = self.event_rx.recv() => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.handle_backend_event(event);
                }
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { text, reply } => {
                let outcome = self.submit(text);
                let _ = reply.send(outcome);
            }

            Command::Open {
                context_id,
                locale,
                reply,
            } => {
                if let Some(locale) = locale {
                    self.context.locale = locale;
                }
                let opening = self.contexts.resolve(&context_id, self.context.locale);
                self.context.context_id = opening.context_id.clone();
                tracing::info!(
                    session_id = %self.context.session_id,
                    requested = %context_id,
                    context = %opening.context_id,
                    locale = %self.context.locale,
                    illustrated = opening.illustration.is_some(),
                    "Opening context"
                );

                let opened = opening.context_id.clone();
                match transition(&self.state, &self.context, Event::ContextOpened { opening }) {
                    Ok(result) => self.commit(result),
                    Err(e) => tracing::warn!(error = %e, "Context opening rejected"),
                }
                self.publish_status();
                let _ = reply.send(opened);
            }

            Command::SetLocale { locale, reply } => {
                tracing::info!(session_id = %self.context.session_id, %locale, "Locale changed");
                self.context.locale = locale;
                self.publish_status();
                let _ = reply.send(());
            }

            // Timeline changes only happen on this task, so nothing can
            // slip between the snapshot and the subscription.
            Command::Sync { reply } => {
                let _ = reply.send(SessionSync {
                    status: self.status_tx.borrow().clone(),
                    entries: self.timeline.snapshot(),
                    events: self.broadcast_tx.subscribe(),
                });
            }
        }
    }

    fn submit(&mut self, text: String) -> SubmitOutcome {
        let turn = self.next_turn.next();
        self.next_turn = turn;
        let history = HistoryMessage::from_entries(&self.timeline.snapshot());

        let event = Event::UserSubmit {
            turn,
            text,
            history,
        };
        match transition(&self.state, &self.context, event) {
            Ok(result) => {
                let navigate = result.effects.contains(&Effect::NavigateHome);
                self.commit(result);
                if navigate {
                    SubmitOutcome::NavigateHome
                } else {
                    SubmitOutcome::Accepted
                }
            }
            Err(TransitionError::EmptySubmission) => SubmitOutcome::Ignored,
            Err(TransitionError::Busy) => {
                tracing::debug!(session_id = %self.context.session_id, "Submission while busy");
                SubmitOutcome::Busy
            }
            Err(e) => {
                tracing::warn!(session_id = %self.context.session_id, error = %e, "Unexpected submit rejection");
                SubmitOutcome::Ignored
            }
        }
    }

    fn handle_backend_event(&mut self, event: Event) {
        match transition(&self.state, &self.context, event) {
            Ok(result) => self.commit(result),
            // A reopen discarded the turn this result belongs to.
            Err(TransitionError::StaleResult(turn)) => {
                tracing::debug!(session_id = %self.context.session_id, %turn, "Dropping stale result");
            }
            Err(e) => {
                tracing::warn!(session_id = %self.context.session_id, error = %e, "Backend event rejected");
            }
        }
    }

    /// Adopt the new state, then run its effects in order
    fn commit(&mut self, result: TransitionResult) {
        if result.new_state != self.state {
            tracing::debug!(
                session_id = %self.context.session_id,
                from = ?self.state,
                to = ?result.new_state,
                "State transition"
            );
            self.state = result.new_state;
            let _ = self.broadcast_tx.send(SessionEvent::StateChange {
                state: self.state.clone(),
            });
            self.publish_status();
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendEntry(draft) => {
                self.append(draft);
            }

            Effect::AppendPendingImage { text, prompt, turn } => {
                let entry_id = self.append(EntryDraft::awaiting_image(text));

                let image = self.image.clone();
                let event_tx = self.event_tx.clone();
                let aspect_ratio = self.context.aspect_ratio;
                let session_id = self.context.session_id.clone();
                self.in_flight += 1;

                tokio::spawn(async move {
                    tracing::info!(%session_id, %entry_id, "Requesting image (background)");
                    let image = image.generate_image(&prompt, aspect_ratio).await;
                    let _ = event_tx
                        .send(Event::ImageResolved {
                            entry_id,
                            turn,
                            image,
                        })
                        .await;
                });
            }

            Effect::RequestText {
                turn,
                history,
                message,
                locale,
            } => {
                let text = self.text.clone();
                let event_tx = self.event_tx.clone();
                let session_id = self.context.session_id.clone();
                self.in_flight += 1;

                tokio::spawn(async move {
                    tracing::info!(%session_id, %turn, history_len = history.len(), "Requesting text (background)");
                    let event = match text.complete_text(&history, &message, locale).await {
                        Ok(text) => Event::TextReply { turn, text },
                        Err(e) => {
                            tracing::warn!(%session_id, %turn, error = %e, kind = ?e.kind, "Text request failed");
                            Event::TextFailed { turn }
                        }
                    };
                    let _ = event_tx.send(event).await;
                });
            }

            Effect::PatchEntry { id, patch } => match self.timeline.patch(&id, patch) {
                Ok(entry) => {
                    let _ = self.broadcast_tx.send(SessionEvent::EntryPatched { entry });
                }
                // The entry was discarded by a reopen while its image rendered.
                Err(TimelineError::NotFound(id)) => {
                    tracing::debug!(session_id = %self.context.session_id, entry_id = %id, "Patch target gone");
                }
                Err(e) => {
                    tracing::warn!(session_id = %self.context.session_id, error = %e, "Patch rejected");
                }
            },

            Effect::ResetTimeline => {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    dropped = self.timeline.len(),
                    "Resetting timeline"
                );
                self.timeline.reset();
                let _ = self.broadcast_tx.send(SessionEvent::TimelineReset);
            }

            Effect::NavigateHome => {
                tracing::info!(session_id = %self.context.session_id, "Navigation requested");
                let _ = self.broadcast_tx.send(SessionEvent::NavigateHome);
            }
        }
    }

    fn append(&self, draft: EntryDraft) -> crate::timeline::EntryId {
        let id = self.timeline.append(draft);
        if let Some(entry) = self.timeline.get(&id) {
            let _ = self.broadcast_tx.send(SessionEvent::EntryAppended { entry });
        }
        id
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(SessionStatus {
            state: self.state.clone(),
            context_id: self.context.context_id.clone(),
            locale: self.context.locale,
        });
    }
}
