//! Events that can occur in a conversation

use super::state::TurnId;
use crate::contexts::Opening;
use crate::llm::HistoryMessage;
use crate::timeline::{EntryId, ImageRef};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        turn: TurnId,
        text: String,
        /// Timeline as it stood before this submission
        history: Vec<HistoryMessage>,
    },
    ContextOpened {
        opening: Opening,
    },

    // Backend events
    TextReply {
        turn: TurnId,
        text: String,
    },
    /// The text backend failed; the detail is only logged
    TextFailed {
        turn: TurnId,
    },
    ImageResolved {
        entry_id: EntryId,
        /// Turn that requested the image; `None` for context openings
        turn: Option<TurnId>,
        image: Option<ImageRef>,
    },
}
