//! Trait abstractions for runtime I/O
//!
//! The session runtime talks to the outside world only through these two
//! seams, which lets tests drive it with mock backends.

use crate::llm::{AspectRatio, HistoryMessage, LlmError};
use crate::locale::Locale;
use crate::timeline::ImageRef;
use async_trait::async_trait;
use std::sync::Arc;

/// Generative-text backend
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Produce a reply to `message` given the prior `history`.
    async fn complete_text(
        &self,
        history: &[HistoryMessage],
        message: &str,
        locale: Locale,
    ) -> Result<String, LlmError>;

    fn model_id(&self) -> &str;
}

/// Generative-image backend
///
/// Failures are reported as `None`, never as errors.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Option<ImageRef>;

    fn model_id(&self) -> &str;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: TextBackend + ?Sized> TextBackend for Arc<T> {
    async fn complete_text(
        &self,
        history: &[HistoryMessage],
        message: &str,
        locale: Locale,
    ) -> Result<String, LlmError> {
        (**self).complete_text(history, message, locale).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

#[async_trait]
impl<T: ImageBackend + ?Sized> ImageBackend for Arc<T> {
    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Option<ImageRef> {
        (**self).generate_image(prompt, aspect_ratio).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}
