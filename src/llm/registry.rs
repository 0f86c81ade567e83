//! Backend selection from configuration

use super::{
    AspectRatio, GeminiImageService, GeminiTextService, HistoryMessage, LlmError,
    LoggingImageBackend, LoggingTextBackend,
};
use crate::locale::Locale;
use crate::runtime::{ImageBackend, TextBackend};
use crate::timeline::ImageRef;
use async_trait::async_trait;
use std::sync::Arc;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Configuration for the generative backends
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    /// Gateway URL; when set, authentication is left to the gateway
    pub gateway: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
}

impl LlmConfig {
    fn api_key(&self) -> Option<String> {
        if self.gateway.is_some() {
            return Some("implicit".to_string());
        }
        self.gemini_api_key
            .as_ref()
            .filter(|key| !key.trim().is_empty())
            .cloned()
    }
}

/// The text and image backends a server runs with
#[derive(Clone)]
pub struct Backends {
    pub text: Arc<dyn TextBackend>,
    pub image: Arc<dyn ImageBackend>,
}

impl Backends {
    /// Build logged Gemini backends, or unconfigured ones when no key is available.
    pub fn from_config(config: &LlmConfig) -> Self {
        let text_model = config.text_model.as_deref().unwrap_or(DEFAULT_TEXT_MODEL);
        let image_model = config.image_model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL);

        let Some(api_key) = config.api_key() else {
            let unconfigured = Arc::new(UnconfiguredBackend);
            return Self {
                text: unconfigured.clone(),
                image: unconfigured,
            };
        };

        let gateway = config.gateway.as_deref();
        let text: Arc<dyn TextBackend> = Arc::new(GeminiTextService::new(
            api_key.clone(),
            text_model,
            gateway,
        ));
        let image: Arc<dyn ImageBackend> =
            Arc::new(GeminiImageService::new(api_key, image_model, gateway));

        Self {
            text: Arc::new(LoggingTextBackend::new(text)),
            image: Arc::new(LoggingImageBackend::new(image)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.text.model_id() != UnconfiguredBackend::MODEL_ID
    }
}

/// Stand-in used when no credentials are configured: text fails, images are absent.
pub struct UnconfiguredBackend;

impl UnconfiguredBackend {
    pub const MODEL_ID: &'static str = "unconfigured";
}

#[async_trait]
impl TextBackend for UnconfiguredBackend {
    async fn complete_text(
        &self,
        _history: &[HistoryMessage],
        _message: &str,
        _locale: Locale,
    ) -> Result<String, LlmError> {
        Err(LlmError::auth("GEMINI_API_KEY is not set"))
    }

    fn model_id(&self) -> &str {
        Self::MODEL_ID
    }
}

#[async_trait]
impl ImageBackend for UnconfiguredBackend {
    async fn generate_image(&self, _prompt: &str, _aspect_ratio: AspectRatio) -> Option<ImageRef> {
        None
    }

    fn model_id(&self) -> &str {
        Self::MODEL_ID
    }
}
