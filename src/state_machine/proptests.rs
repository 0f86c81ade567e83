//! Property-based tests for the state machine

use super::transition::*;
use super::*;
use crate::llm::AspectRatio;
use crate::locale::{Locale, NAVIGATION_KEYWORDS};
use crate::timeline::{EntryDraft, EntryId, ImageRef, Speaker};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context(locale: Locale) -> SessionContext {
    SessionContext::new("prop-session", locale, AspectRatio::Wide)
}

fn arb_locale() -> impl Strategy<Value = Locale> {
    prop_oneof![Just(Locale::En), Just(Locale::Zh)]
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![Just(ConvState::Idle), arb_busy_state()]
}

/// States holding a turn in flight
fn arb_busy_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        (0u64..8, arb_locale()).prop_map(|(t, locale)| ConvState::AwaitingText {
            turn: TurnId(t),
            locale
        }),
        (0u64..8).prop_map(|t| ConvState::AwaitingImage { turn: TurnId(t) }),
    ]
}

/// Submissions that are neither blank nor navigation keywords
fn arb_message() -> impl Strategy<Value = String> {
    "[a-zA-Z]{3,12}( [a-zA-Z]{1,8}){1,4}".prop_filter("not a keyword", |s| {
        !crate::locale::is_navigation_command(s)
    })
}

fn arb_reply() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?]{0,80}"
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0u64..8, arb_message()).prop_map(|(t, text)| Event::UserSubmit {
            turn: TurnId(t),
            text,
            history: vec![],
        }),
        (0u64..8, arb_reply()).prop_map(|(t, text)| Event::TextReply {
            turn: TurnId(t),
            text,
        }),
        (0u64..8).prop_map(|t| Event::TextFailed { turn: TurnId(t) }),
        (proptest::option::of(0u64..8), any::<bool>()).prop_map(|(t, ok)| {
            Event::ImageResolved {
                entry_id: EntryId::new(),
                turn: t.map(TurnId),
                image: ok.then(|| ImageRef::new("data:image/png;base64,AA")),
            }
        }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn accepted_submission_records_user_before_backend_call(
        text in arb_message(),
        locale in arb_locale(),
    ) {
        let result = transition(&ConvState::Idle, &test_context(locale), Event::UserSubmit {
            turn: TurnId(99),
            text: text.clone(),
            history: vec![],
        }).unwrap();

        prop_assert_eq!(result.effects.len(), 2);
        prop_assert_eq!(&result.effects[0], &Effect::AppendEntry(EntryDraft::user(text.trim())));
        let is_text_request = matches!(result.effects[1], Effect::RequestText { .. });
        prop_assert!(is_text_request);
        prop_assert_eq!(result.new_state, ConvState::AwaitingText { turn: TurnId(99), locale });
    }

    #[test]
    fn navigation_keywords_never_touch_the_timeline(
        idx in 0..NAVIGATION_KEYWORDS.len(),
        upper in any::<bool>(),
        pad in "[ \t]{0,3}",
    ) {
        let (_, keyword) = NAVIGATION_KEYWORDS[idx];
        let keyword = if upper { keyword.to_uppercase() } else { keyword.to_string() };
        let text = format!("{pad}{keyword}{pad}");

        let result = transition(&ConvState::Idle, &test_context(Locale::En), Event::UserSubmit {
            turn: TurnId(1),
            text,
            history: vec![],
        }).unwrap();

        prop_assert_eq!(result.new_state, ConvState::Idle);
        prop_assert_eq!(result.effects, vec![Effect::NavigateHome]);
    }

    #[test]
    fn turn_in_flight_rejects_every_submission(
        state in arb_busy_state(),
        text in prop_oneof![arb_message(), Just("menu".to_string()), Just("你好".to_string())],
    ) {
        let err = transition(&state, &test_context(Locale::En), Event::UserSubmit {
            turn: TurnId(42),
            text,
            history: vec![],
        }).unwrap_err();
        prop_assert_eq!(err, TransitionError::Busy);
    }

    #[test]
    fn blank_submissions_are_always_rejected(
        state in arb_state(),
        text in "[ \t\n]{0,6}",
    ) {
        let err = transition(&state, &test_context(Locale::En), Event::UserSubmit {
            turn: TurnId(1),
            text,
            history: vec![],
        }).unwrap_err();
        prop_assert_eq!(err, TransitionError::EmptySubmission);
    }

    #[test]
    fn directive_text_never_reaches_the_timeline(
        before in "[a-zA-Z .]{0,40}",
        prompt in "[a-z][a-z ]{0,30}",
        after in "[a-zA-Z .]{0,40}",
    ) {
        let reply = format!("{before} [Image of {prompt}] {after}");
        let state = ConvState::AwaitingText { turn: TurnId(1), locale: Locale::En };
        let result = transition(&state, &test_context(Locale::En), Event::TextReply {
            turn: TurnId(1),
            text: reply,
        }).unwrap();

        prop_assert_eq!(result.new_state, ConvState::AwaitingImage { turn: TurnId(1) });
        match &result.effects[..] {
            [Effect::AppendPendingImage { text, .. }] => {
                prop_assert!(!text.contains("[Image of"));
            }
            other => prop_assert!(false, "unexpected effects {:?}", other),
        }
    }

    #[test]
    fn plain_replies_never_pend(reply in arb_reply()) {
        let state = ConvState::AwaitingText { turn: TurnId(1), locale: Locale::En };
        let result = transition(&state, &test_context(Locale::En), Event::TextReply {
            turn: TurnId(1),
            text: reply,
        }).unwrap();

        prop_assert_eq!(result.new_state, ConvState::Idle);
        match &result.effects[..] {
            [Effect::AppendEntry(draft)] => {
                prop_assert_eq!(draft.speaker, Speaker::Assistant);
                prop_assert!(!draft.image_pending);
            }
            other => prop_assert!(false, "unexpected effects {:?}", other),
        }
    }

    #[test]
    fn image_resolution_always_clears_pending(
        state in arb_state(),
        turn in proptest::option::of(0u64..8),
        ok in any::<bool>(),
    ) {
        let result = transition(&state, &test_context(Locale::En), Event::ImageResolved {
            entry_id: EntryId::new(),
            turn: turn.map(TurnId),
            image: ok.then(|| ImageRef::new("data:image/png;base64,AA")),
        }).unwrap();

        match &result.effects[..] {
            [Effect::PatchEntry { patch, .. }] => {
                prop_assert_eq!(patch.image_pending, Some(false));
                prop_assert_eq!(patch.image_ref.is_some(), ok);
            }
            other => prop_assert!(false, "unexpected effects {:?}", other),
        }
        // Only the image of the awaited turn moves the controller.
        if result.new_state != state {
            prop_assert_eq!(result.new_state, ConvState::Idle);
            prop_assert_eq!(state, ConvState::AwaitingImage { turn: TurnId(turn.unwrap_or_default()) });
        }
    }

    #[test]
    fn successful_transitions_always_emit_effects(
        state in arb_state(),
        event in arb_event(),
    ) {
        if let Ok(result) = transition(&state, &test_context(Locale::En), event) {
            prop_assert!(!result.effects.is_empty());
        }
    }

    #[test]
    fn busy_state_only_advances_on_its_own_turn(
        current in 0u64..8,
        event in arb_event(),
    ) {
        let state = ConvState::AwaitingText { turn: TurnId(current), locale: Locale::En };
        let result = transition(&state, &test_context(Locale::En), event.clone());
        match event {
            Event::UserSubmit { .. } => {
                prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
            }
            Event::TextReply { turn, .. } | Event::TextFailed { turn } if turn.0 != current => {
                prop_assert_eq!(result.unwrap_err(), TransitionError::StaleResult(turn));
            }
            Event::ImageResolved { .. } => {
                prop_assert_eq!(result.unwrap().new_state, state);
            }
            _ => {
                let is_awaiting_text = matches!(result.unwrap().new_state, ConvState::AwaitingText { .. });
                prop_assert!(!is_awaiting_text);
            }
        }
    }
}
