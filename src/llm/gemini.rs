//! Google Gemini provider implementation

use super::types::{AspectRatio, HistoryMessage};
use super::LlmError;
use crate::locale::Locale;
use crate::runtime::{ImageBackend, TextBackend};
use crate::system_prompt::build_system_instruction;
use crate::timeline::{ImageRef, Speaker};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DIRECT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Shared HTTP plumbing for both Gemini services
struct GeminiEndpoint {
    client: Client,
    api_key: String,
    url: String,
}

impl GeminiEndpoint {
    fn new(api_key: String, model: &str, gateway: Option<&str>, timeout: Duration) -> Self {
        let url = match gateway {
            Some(gw) => format!(
                "{}/gemini/v1beta/models/{model}:generateContent",
                gw.trim_end_matches('/')
            ),
            None => format!("{DIRECT_BASE_URL}/models/{model}:generateContent"),
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            url,
        }
    }

    fn request_url(&self) -> String {
        if self.api_key.starts_with("implicit") {
            // Gateway mode handles authentication
            self.url.clone()
        } else {
            format!("{}?key={}", self.url, self.api_key)
        }
    }

    async fn generate(&self, request: &GeminiRequest) -> Result<GeminiResponse, LlmError> {
        let response = self
            .client
            .post(self.request_url())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |error_resp| error_resp.error.message);
            return Err(LlmError::from_status(status.as_u16(), message));
        }

        serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e}")))
    }
}

// ============================================================================
// Text
// ============================================================================

/// Gemini text service
pub struct GeminiTextService {
    endpoint: GeminiEndpoint,
    model_id: String,
}

impl GeminiTextService {
    pub fn new(api_key: String, model: &str, gateway: Option<&str>) -> Self {
        Self {
            endpoint: GeminiEndpoint::new(api_key, model, gateway, Duration::from_secs(120)),
            model_id: model.to_string(),
        }
    }

    fn translate_request(
        history: &[HistoryMessage],
        message: &str,
        locale: Locale,
    ) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = history
            .iter()
            .filter(|h| !h.text.is_empty())
            .map(|h| GeminiContent {
                role: Some(role_name(h.speaker).to_string()),
                parts: vec![GeminiPart::text(&h.text)],
            })
            .collect();

        contents.push(GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart::text(message)],
        });

        GeminiRequest {
            contents,
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(build_system_instruction(locale))],
            }),
            generation_config: None,
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<String, LlmError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::empty_reply("No candidates in response"))?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::empty_reply("Response contained no text"));
        }
        Ok(text)
    }
}

fn role_name(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::User => "user",
        Speaker::Assistant => "model",
    }
}

#[async_trait]
impl TextBackend for GeminiTextService {
    async fn complete_text(
        &self,
        history: &[HistoryMessage],
        message: &str,
        locale: Locale,
    ) -> Result<String, LlmError> {
        let request = Self::translate_request(history, message, locale);
        let response = self.endpoint.generate(&request).await?;
        Self::normalize_response(response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Image
// ============================================================================

/// Gemini image service
pub struct GeminiImageService {
    endpoint: GeminiEndpoint,
    model_id: String,
}

impl GeminiImageService {
    pub fn new(api_key: String, model: &str, gateway: Option<&str>) -> Self {
        Self {
            endpoint: GeminiEndpoint::new(api_key, model, gateway, Duration::from_secs(180)),
            model_id: model.to_string(),
        }
    }

    fn translate_request(prompt: &str, aspect_ratio: AspectRatio) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::text(prompt)],
            }],
            system_instruction: None,
            generation_config: Some(GeminiGenerationConfig {
                image_config: Some(GeminiImageConfig {
                    aspect_ratio: aspect_ratio.as_str().to_string(),
                }),
            }),
        }
    }

    /// First inline image of the first candidate, as a data URL
    fn extract_image(resp: GeminiResponse) -> Option<ImageRef> {
        resp.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|part| part.inline_data)
            .map(|data| {
                let mime = data.mime_type.unwrap_or_else(|| "image/png".to_string());
                ImageRef::new(format!("data:{mime};base64,{}", data.data))
            })
    }
}

#[async_trait]
impl ImageBackend for GeminiImageService {
    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Option<ImageRef> {
        let request = Self::translate_request(prompt, aspect_ratio);
        match self.endpoint.generate(&request).await {
            Ok(response) => {
                let image = Self::extract_image(response);
                if image.is_none() {
                    tracing::warn!(model = %self.model_id, "Image response had no inline data");
                }
                image
            }
            Err(e) => {
                tracing::warn!(model = %self.model_id, error = %e, "Image generation failed");
                None
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
