//! Generative backend providers
//!
//! Gemini implementations of the text and image backends, plus logging
//! decorators that wrap whichever backend is configured.

mod error;
mod gemini;
mod registry;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use gemini::{GeminiImageService, GeminiTextService};
pub use registry::{Backends, LlmConfig, UnconfiguredBackend};
pub use types::*;

use crate::locale::Locale;
use crate::runtime::{ImageBackend, TextBackend};
use crate::timeline::ImageRef;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Logging wrapper for text backends
pub struct LoggingTextBackend {
    inner: Arc<dyn TextBackend>,
    model_id: String,
}

impl LoggingTextBackend {
    pub fn new(inner: Arc<dyn TextBackend>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl TextBackend for LoggingTextBackend {
    async fn complete_text(
        &self,
        history: &[HistoryMessage],
        message: &str,
        locale: Locale,
    ) -> Result<String, LlmError> {
        let start = Instant::now();
        let result = self.inner.complete_text(history, message, locale).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    history_len = history.len(),
                    reply_chars = reply.chars().count(),
                    %locale,
                    "Text request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    transient = e.kind.is_transient(),
                    "Text request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Logging wrapper for image backends
pub struct LoggingImageBackend {
    inner: Arc<dyn ImageBackend>,
    model_id: String,
}

impl LoggingImageBackend {
    pub fn new(inner: Arc<dyn ImageBackend>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl ImageBackend for LoggingImageBackend {
    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Option<ImageRef> {
        let start = Instant::now();
        let result = self.inner.generate_image(prompt, aspect_ratio).await;

        tracing::info!(
            model = %self.model_id,
            duration_ms = %start.elapsed().as_millis(),
            %aspect_ratio,
            produced = result.is_some(),
            "Image request finished"
        );

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
