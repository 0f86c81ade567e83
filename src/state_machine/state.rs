//! Conversation state types

use crate::llm::AspectRatio;
use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one user submission within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(pub u64);

impl TurnId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Turn controller state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for user input
    #[default]
    Idle,

    /// Text request in flight for `turn`
    AwaitingText {
        turn: TurnId,
        /// Locale at submission time, used for the failure message
        locale: Locale,
    },

    /// Assistant text shown, illustration for `turn` still rendering
    AwaitingImage { turn: TurnId },
}

impl ConvState {
    /// Whether a new submission would be rejected. A turn holds the
    /// session until its illustration has settled.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ConvState::AwaitingText { .. } | ConvState::AwaitingImage { .. }
        )
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConvState::Idle)
    }
}

/// Per-session settings the transition function may read
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub locale: Locale,
    /// Context id of the currently opened context
    pub context_id: String,
    pub aspect_ratio: AspectRatio,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, locale: Locale, aspect_ratio: AspectRatio) -> Self {
        Self {
            session_id: session_id.into(),
            locale,
            context_id: crate::contexts::FALLBACK_CONTEXT.to_string(),
            aspect_ratio,
        }
    }
}
