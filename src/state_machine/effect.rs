//! Effects produced by state transitions

use super::state::TurnId;
use crate::llm::HistoryMessage;
use crate::locale::Locale;
use crate::timeline::{EntryDraft, EntryId, EntryPatch};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append an entry to the timeline
    AppendEntry(EntryDraft),

    /// Append an assistant entry with a pending image, then request the image
    AppendPendingImage {
        text: String,
        prompt: String,
        turn: Option<TurnId>,
    },

    /// Make a text request (spawns as background task)
    RequestText {
        turn: TurnId,
        history: Vec<HistoryMessage>,
        message: String,
        locale: Locale,
    },

    /// Patch an existing entry by id
    PatchEntry { id: EntryId, patch: EntryPatch },

    /// Drop every entry
    ResetTimeline,

    /// Tell the caller to return to the context selector
    NavigateHome,
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendEntry(EntryDraft::user(text))
    }

    pub fn append_assistant(text: impl Into<String>) -> Self {
        Effect::AppendEntry(EntryDraft::assistant(text))
    }
}
