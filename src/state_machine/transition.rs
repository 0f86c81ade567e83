//! Pure state transition function
//!
//! Given the same state, context and event this always yields the same
//! result; every side effect is described by the returned `Effect`s.

use super::{ConvState, Effect, Event, SessionContext, TurnId};
use crate::directive;
use crate::locale::is_navigation_command;
use crate::timeline::EntryPatch;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Submission is empty")]
    EmptySubmission,
    #[error("A reply is still being generated")]
    Busy,
    #[error("Result for turn {0} no longer applies")]
    StaleResult(TurnId),
}

pub fn transition(
    state: &ConvState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User submissions
        // ============================================================
        (_, Event::UserSubmit { turn, text, history }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptySubmission);
            }
            if state.is_busy() {
                return Err(TransitionError::Busy);
            }
            if is_navigation_command(text) {
                return Ok(TransitionResult::new(state.clone()).with_effect(Effect::NavigateHome));
            }

            Ok(TransitionResult::new(ConvState::AwaitingText {
                turn,
                locale: context.locale,
            })
            .with_effect(Effect::append_user(text))
            .with_effect(Effect::RequestText {
                turn,
                history,
                message: text.to_string(),
                locale: context.locale,
            }))
        }

        // ============================================================
        // Context opening
        // ============================================================
        (_, Event::ContextOpened { opening }) => {
            let mut result = TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::ResetTimeline)
                .with_effect(Effect::append_assistant(opening.greeting));

            // No turn owns the quote's image, so it settles without moving
            // the controller.
            if let Some(illustration) = opening.illustration {
                result = result.with_effect(Effect::AppendPendingImage {
                    text: illustration.quote,
                    prompt: illustration.prompt,
                    turn: None,
                });
            }
            Ok(result)
        }

        // ============================================================
        // Text backend results
        // ============================================================
        (ConvState::AwaitingText { turn: current, .. }, Event::TextReply { turn, text })
            if *current == turn =>
        {
            let (effect, awaits_image) = assistant_reply(&text, Some(turn));
            let next = if awaits_image {
                ConvState::AwaitingImage { turn }
            } else {
                ConvState::Idle
            };
            Ok(TransitionResult::new(next).with_effect(effect))
        }

        (
            ConvState::AwaitingText {
                turn: current,
                locale,
            },
            Event::TextFailed { turn },
        ) if *current == turn => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::append_assistant(locale.connection_error_message()))),

        (_, Event::TextReply { turn, .. } | Event::TextFailed { turn }) => {
            Err(TransitionError::StaleResult(turn))
        }

        // ============================================================
        // Image backend results
        // ============================================================
        (_, Event::ImageResolved {
            entry_id,
            turn,
            image,
        }) => {
            let next = match state {
                ConvState::AwaitingImage { turn: current } if turn == Some(*current) => {
                    ConvState::Idle
                }
                other => other.clone(),
            };
            Ok(TransitionResult::new(next).with_effect(Effect::PatchEntry {
                id: entry_id,
                patch: EntryPatch::image_settled(image),
            }))
        }
    }
}

/// Effect that records an assistant reply, and whether it requested an image
fn assistant_reply(raw: &str, turn: Option<TurnId>) -> (Effect, bool) {
    let parsed = directive::parse(raw);
    match parsed.image_prompt {
        Some(prompt) => (
            Effect::AppendPendingImage {
                text: parsed.display_text,
                prompt,
                turn,
            },
            true,
        ),
        None => (Effect::append_assistant(parsed.display_text), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::{ContextTable, Illustration, Opening};
    use crate::llm::{AspectRatio, HistoryMessage};
    use crate::locale::Locale;
    use crate::timeline::{EntryDraft, EntryId, ImageRef};

    fn test_context() -> SessionContext {
        SessionContext::new("test-session", Locale::En, AspectRatio::Wide)
    }

    fn submit(turn: u64, text: &str) -> Event {
        Event::UserSubmit {
            turn: TurnId(turn),
            text: text.to_string(),
            history: vec![],
        }
    }

    fn awaiting_text(turn: u64) -> ConvState {
        ConvState::AwaitingText {
            turn: TurnId(turn),
            locale: Locale::En,
        }
    }

    #[test]
    fn test_submit_appends_user_then_requests_text() {
        let history = vec![HistoryMessage::assistant("Welcome")];
        let result = transition(
            &ConvState::Idle,
            &test_context(),
            Event::UserSubmit {
                turn: TurnId(1),
                text: "  Help me prioritise  ".to_string(),
                history: history.clone(),
            },
        )
        .unwrap();

        assert_eq!(result.new_state, awaiting_text(1));
        assert_eq!(
            result.effects,
            vec![
                Effect::AppendEntry(EntryDraft::user("Help me prioritise")),
                Effect::RequestText {
                    turn: TurnId(1),
                    history,
                    message: "Help me prioritise".to_string(),
                    locale: Locale::En,
                },
            ]
        );
    }

    #[test]
    fn test_blank_submit_is_rejected() {
        let err = transition(&ConvState::Idle, &test_context(), submit(1, " \n\t")).unwrap_err();
        assert_eq!(err, TransitionError::EmptySubmission);
    }

    #[test]
    fn test_submit_while_awaiting_text_is_busy() {
        let err = transition(&awaiting_text(1), &test_context(), submit(2, "again")).unwrap_err();
        assert_eq!(err, TransitionError::Busy);
    }

    #[test]
    fn test_busy_takes_precedence_over_navigation() {
        let err = transition(&awaiting_text(1), &test_context(), submit(2, "menu")).unwrap_err();
        assert_eq!(err, TransitionError::Busy);
    }

    #[test]
    fn test_navigation_keyword_short_circuits() {
        let result = transition(&ConvState::Idle, &test_context(), submit(1, "hi")).unwrap();
        assert_eq!(result.new_state, ConvState::Idle);
        assert_eq!(result.effects, vec![Effect::NavigateHome]);
    }

    #[test]
    fn test_submit_while_awaiting_image_is_busy() {
        let state = ConvState::AwaitingImage { turn: TurnId(1) };
        let err = transition(&state, &test_context(), submit(2, "next question")).unwrap_err();
        assert_eq!(err, TransitionError::Busy);

        let err = transition(&state, &test_context(), submit(2, "menu")).unwrap_err();
        assert_eq!(err, TransitionError::Busy);
    }

    #[test]
    fn test_submit_accepted_again_once_image_settles() {
        let settled = transition(
            &ConvState::AwaitingImage { turn: TurnId(1) },
            &test_context(),
            Event::ImageResolved {
                entry_id: EntryId::from("entry-1"),
                turn: Some(TurnId(1)),
                image: None,
            },
        )
        .unwrap();
        let result = transition(&settled.new_state, &test_context(), submit(2, "next question"))
            .unwrap();
        assert_eq!(result.new_state, awaiting_text(2));
    }

    #[test]
    fn test_plain_reply_returns_to_idle() {
        let result = transition(
            &awaiting_text(1),
            &test_context(),
            Event::TextReply {
                turn: TurnId(1),
                text: "Just a plain answer.".to_string(),
            },
        )
        .unwrap();
        assert_eq!(result.new_state, ConvState::Idle);
        assert_eq!(
            result.effects,
            vec![Effect::AppendEntry(EntryDraft::assistant("Just a plain answer."))]
        );
    }

    #[test]
    fn test_directive_reply_awaits_image() {
        let result = transition(
            &awaiting_text(1),
            &test_context(),
            Event::TextReply {
                turn: TurnId(1),
                text: "Here is the plan. [Image of a rocket launch]".to_string(),
            },
        )
        .unwrap();
        assert_eq!(result.new_state, ConvState::AwaitingImage { turn: TurnId(1) });
        assert_eq!(
            result.effects,
            vec![Effect::AppendPendingImage {
                text: "Here is the plan.".to_string(),
                prompt: "a rocket launch".to_string(),
                turn: Some(TurnId(1)),
            }]
        );
    }

    #[test]
    fn test_text_failure_uses_submission_locale() {
        let state = ConvState::AwaitingText {
            turn: TurnId(4),
            locale: Locale::Zh,
        };
        // The session has since switched back to English.
        let result = transition(
            &state,
            &test_context(),
            Event::TextFailed { turn: TurnId(4) },
        )
        .unwrap();
        assert_eq!(result.new_state, ConvState::Idle);
        assert_eq!(
            result.effects,
            vec![Effect::append_assistant(Locale::Zh.connection_error_message())]
        );
    }

    #[test]
    fn test_reply_for_other_turn_is_stale() {
        let err = transition(
            &awaiting_text(2),
            &test_context(),
            Event::TextReply {
                turn: TurnId(1),
                text: "late".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::StaleResult(TurnId(1)));

        let err = transition(
            &ConvState::Idle,
            &test_context(),
            Event::TextFailed { turn: TurnId(1) },
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::StaleResult(TurnId(1)));
    }

    #[test]
    fn test_image_for_current_turn_settles_to_idle() {
        let entry_id = EntryId::from("entry-1");
        let image = Some(ImageRef::new("data:image/png;base64,AAAA"));
        let result = transition(
            &ConvState::AwaitingImage { turn: TurnId(1) },
            &test_context(),
            Event::ImageResolved {
                entry_id: entry_id.clone(),
                turn: Some(TurnId(1)),
                image: image.clone(),
            },
        )
        .unwrap();
        assert_eq!(result.new_state, ConvState::Idle);
        assert_eq!(
            result.effects,
            vec![Effect::PatchEntry {
                id: entry_id,
                patch: EntryPatch::image_settled(image),
            }]
        );
    }

    #[test]
    fn test_failed_image_still_settles() {
        let result = transition(
            &ConvState::AwaitingImage { turn: TurnId(1) },
            &test_context(),
            Event::ImageResolved {
                entry_id: EntryId::from("entry-1"),
                turn: Some(TurnId(1)),
                image: None,
            },
        )
        .unwrap();
        assert_eq!(result.new_state, ConvState::Idle);
        let Effect::PatchEntry { patch, .. } = &result.effects[0] else {
            panic!("expected a patch");
        };
        assert_eq!(patch.image_pending, Some(false));
        assert!(patch.image_ref.is_none());
    }

    #[test]
    fn test_image_from_before_reopen_leaves_next_turn_running() {
        let result = transition(
            &awaiting_text(2),
            &test_context(),
            Event::ImageResolved {
                entry_id: EntryId::from("entry-1"),
                turn: Some(TurnId(1)),
                image: None,
            },
        )
        .unwrap();
        assert_eq!(result.new_state, awaiting_text(2));
        assert!(matches!(result.effects[0], Effect::PatchEntry { .. }));
    }

    #[test]
    fn test_opening_self_appends_greeting_and_pending_quote() {
        let opening = ContextTable::builtin().resolve("self", Locale::En);
        let illustration = opening.illustration.clone().unwrap();
        let result = transition(
            &awaiting_text(3),
            &test_context(),
            Event::ContextOpened {
                opening: opening.clone(),
            },
        )
        .unwrap();

        assert_eq!(result.new_state, ConvState::Idle);
        assert_eq!(
            result.effects,
            vec![
                Effect::ResetTimeline,
                Effect::append_assistant(opening.greeting),
                Effect::AppendPendingImage {
                    text: illustration.quote,
                    prompt: illustration.prompt,
                    turn: None,
                },
            ]
        );
    }

    #[test]
    fn test_opening_without_illustration_appends_greeting_only() {
        let opening = Opening {
            context_id: "dashboard".to_string(),
            greeting: "How can I help you today?".to_string(),
            illustration: None,
        };
        let result =
            transition(&ConvState::Idle, &test_context(), Event::ContextOpened { opening }).unwrap();
        assert_eq!(result.effects.len(), 2);
        assert_eq!(
            result.effects[1],
            Effect::append_assistant("How can I help you today?")
        );
    }

    fn custom_opening(quote: &str, prompt: &str) -> Opening {
        Opening {
            context_id: "custom".to_string(),
            greeting: "Hello".to_string(),
            illustration: Some(Illustration {
                quote: quote.to_string(),
                prompt: prompt.to_string(),
            }),
        }
    }

    #[test]
    fn test_opening_prompt_with_brackets_is_requested_whole() {
        let opening = custom_opening("Measure twice", "a door marked [EXIT] at night");
        let result =
            transition(&ConvState::Idle, &test_context(), Event::ContextOpened { opening }).unwrap();
        assert_eq!(
            result.effects[2],
            Effect::AppendPendingImage {
                text: "Measure twice".to_string(),
                prompt: "a door marked [EXIT] at night".to_string(),
                turn: None,
            }
        );
    }

    #[test]
    fn test_opening_multiline_prompt_still_pends() {
        let opening = custom_opening("Breathe", "a calm lake\nat dawn");
        let result =
            transition(&ConvState::Idle, &test_context(), Event::ContextOpened { opening }).unwrap();
        assert_eq!(result.new_state, ConvState::Idle);
        assert_eq!(
            result.effects[2],
            Effect::AppendPendingImage {
                text: "Breathe".to_string(),
                prompt: "a calm lake\nat dawn".to_string(),
                turn: None,
            }
        );
    }

    #[test]
    fn test_opening_quote_is_kept_verbatim() {
        let opening = Opening {
            context_id: "custom".to_string(),
            greeting: "Hello".to_string(),
            illustration: Some(Illustration {
                quote: "**\"Less, but better.\"**".to_string(),
                prompt: "a single chair".to_string(),
            }),
        };
        let result =
            transition(&ConvState::Idle, &test_context(), Event::ContextOpened { opening }).unwrap();
        assert_eq!(
            result.effects[2],
            Effect::AppendPendingImage {
                text: "**\"Less, but better.\"**".to_string(),
                prompt: "a single chair".to_string(),
                turn: None,
            }
        );
    }
}
