//! API request and response types

use crate::advisors::AdvisorPortrait;
use crate::contexts::ContextSummary;
use crate::locale::Locale;
use crate::markdown::render_html;
use crate::runtime::{SessionHandle, SessionStatus, SubmitOutcome};
use crate::timeline::Entry;
use serde::{Deserialize, Serialize};

/// Query for localized listings
#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<Locale>,
}

/// Request to start a session
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub context: String,
    #[serde(default)]
    pub locale: Locale,
}

/// Request to switch a session to another context
#[derive(Debug, Deserialize)]
pub struct OpenContextRequest {
    pub context: String,
    pub locale: Option<Locale>,
}

#[derive(Debug, Deserialize)]
pub struct SetLocaleRequest {
    pub locale: Locale,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub outcome: SubmitOutcome,
}

#[derive(Debug, Serialize)]
pub struct ContextListResponse {
    pub contexts: Vec<ContextSummary>,
}

/// Timeline entry with its text rendered for display
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: Entry,
    pub html: String,
}

impl From<Entry> for EntryView {
    fn from(entry: Entry) -> Self {
        let html = render_html(&entry.text);
        Self { entry, html }
    }
}

/// Session status with its full timeline
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    #[serde(flatten)]
    pub status: SessionStatus,
    pub entries: Vec<EntryView>,
}

impl SessionResponse {
    pub fn from_handle(handle: &SessionHandle) -> Self {
        Self::new(handle.id(), handle.status(), handle.snapshot())
    }

    pub fn new(id: &str, status: SessionStatus, entries: Vec<Entry>) -> Self {
        Self {
            id: id.to_string(),
            status,
            entries: entries.into_iter().map(EntryView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdvisorsResponse {
    pub advisors: Vec<AdvisorPortrait>,
    /// False while portraits are still being generated
    pub loaded: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
