//! Conversation timeline store
//!
//! Owns every entry of a session's timeline. Entries are appended in order and
//! afterwards only changed through id-addressed patches, so background image
//! results can land while the foreground turn keeps appending.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Stable, never-reused entry identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Reference to a generated image (data URL or remote URL)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One line of the conversation timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: EntryId,
    pub speaker: Speaker,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<ImageRef>,
    pub image_pending: bool,
    pub created_at: DateTime<Utc>,
}

/// An entry before the store has assigned it an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub speaker: Speaker,
    pub text: String,
    pub image_pending: bool,
}

impl EntryDraft {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            image_pending: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            image_pending: false,
        }
    }

    /// Assistant entry whose image request is about to be issued
    pub fn awaiting_image(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            image_pending: true,
        }
    }
}

/// Partial update merged into an existing entry. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub text: Option<String>,
    pub image_ref: Option<ImageRef>,
    pub image_pending: Option<bool>,
}

impl EntryPatch {
    /// Outcome of an image request: attach the image, if any, and stop pending.
    pub fn image_settled(image: Option<ImageRef>) -> Self {
        Self {
            text: None,
            image_ref: image,
            image_pending: Some(false),
        }
    }

    fn touches_image(&self) -> bool {
        self.image_ref.is_some() || self.image_pending == Some(true)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimelineError {
    #[error("Entry not found: {0}")]
    NotFound(EntryId),
    #[error("Entry already has an image: {0}")]
    ImageAlreadyResolved(EntryId),
    #[error("User entries cannot carry images: {0}")]
    NotAssistant(EntryId),
}

#[derive(Debug, Default)]
struct Timeline {
    entries: Vec<Entry>,
    index: HashMap<EntryId, usize>,
}

/// Thread-safe handle to a session's timeline. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct TimelineStore {
    inner: Arc<RwLock<Timeline>>,
}

impl TimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry at the end and return its freshly assigned id.
    pub fn append(&self, draft: EntryDraft) -> EntryId {
        let id = EntryId::new();
        let entry = Entry {
            id: id.clone(),
            speaker: draft.speaker,
            text: draft.text,
            image_ref: None,
            image_pending: draft.image_pending && draft.speaker == Speaker::Assistant,
            created_at: Utc::now(),
        };

        let mut timeline = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let position = timeline.entries.len();
        timeline.entries.push(entry);
        timeline.index.insert(id.clone(), position);
        id
    }

    /// Merge `patch` into the entry with `id` and return the updated entry.
    ///
    /// A missing id is expected after a reset and leaves the store untouched.
    pub fn patch(&self, id: &EntryId, patch: EntryPatch) -> Result<Entry, TimelineError> {
        let mut timeline = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let position = *timeline
            .index
            .get(id)
            .ok_or_else(|| TimelineError::NotFound(id.clone()))?;
        let entry = &mut timeline.entries[position];

        if patch.touches_image() && entry.speaker == Speaker::User {
            return Err(TimelineError::NotAssistant(id.clone()));
        }
        if patch.image_ref.is_some() && entry.image_ref.is_some() {
            return Err(TimelineError::ImageAlreadyResolved(id.clone()));
        }

        if let Some(text) = patch.text {
            entry.text = text;
        }
        if let Some(image) = patch.image_ref {
            entry.image_ref = Some(image);
        }
        if let Some(pending) = patch.image_pending {
            entry.image_pending = pending;
        }
        Ok(entry.clone())
    }

    pub fn get(&self, id: &EntryId) -> Option<Entry> {
        let timeline = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        timeline
            .index
            .get(id)
            .map(|&position| timeline.entries[position].clone())
    }

    /// Ordered copy of all entries
    pub fn snapshot(&self) -> Vec<Entry> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Drop every entry. Ids handed out before stay invalid forever.
    pub fn reset(&self) {
        let mut timeline = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        timeline.entries.clear();
        timeline.index.clear();
    }
}
