use std::env;
use std::time::Duration;

use async_trait::async_trait;
use cover_contracts::{GatewayError, ImageData};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

use crate::gateway::{
    compose_describe_instruction, prompt_or_fallback, ModelGateway, COVER_ASPECT_RATIO,
};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const ERROR_BODY_MAX_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub text_model: String,
    pub image_model: String,
    pub request_timeout_s: f64,
}

impl GeminiConfig {
    /// Reads `GEMINI_API_KEY`/`GOOGLE_API_KEY`, `GEMINI_API_BASE` and
    /// `COVER_REQUEST_TIMEOUT` from the environment.
    pub fn from_env(text_model: &str, image_model: &str) -> Self {
        Self {
            api_base: env::var("GEMINI_API_BASE")
                .ok()
                .map(|value| value.trim().trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key: non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY")),
            text_model: text_model.to_string(),
            image_model: image_model.to_string(),
            request_timeout_s: request_timeout_seconds(
                non_empty_env("COVER_REQUEST_TIMEOUT").as_deref(),
            ),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            request_timeout_s: 90.0,
        }
    }
}

pub struct GeminiGateway {
    config: GeminiConfig,
    http: HttpClient,
}

impl GeminiGateway {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: HttpClient::new(),
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.config.api_base, model_path)
    }

    fn describe_payload(title: &str, body: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": compose_describe_instruction(title, body) }],
            }],
        })
    }

    fn image_payload(parts: Vec<Value>) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": parts,
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": COVER_ASPECT_RATIO },
            },
        })
    }

    fn generate_payload(prompt: &str) -> Value {
        Self::image_payload(vec![json!({ "text": prompt })])
    }

    fn edit_payload(base: &ImageData, command: &str) -> Value {
        Self::image_payload(vec![
            json!({ "text": command }),
            json!({
                "inlineData": {
                    "mimeType": base.media_type(),
                    "data": base.bare_payload(),
                }
            }),
        ])
    }

    async fn post(&self, model: &str, payload: &Value) -> Result<Value, GatewayError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(GatewayError::Configuration(
                "GEMINI_API_KEY or GOOGLE_API_KEY not set".to_string(),
            ));
        };
        let endpoint = self.endpoint_for_model(model);
        tracing::debug!(%endpoint, "gemini request");

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .timeout(Duration::from_secs_f64(self.config.request_timeout_s))
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                GatewayError::Transport(format!("Gemini request failed ({endpoint}): {err}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            GatewayError::Transport(format!("Gemini response body read failed: {err}"))
        })?;
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "Gemini request failed ({}): {}",
                status.as_u16(),
                truncate_text(&body, ERROR_BODY_MAX_CHARS)
            )));
        }
        serde_json::from_str(&body).map_err(|err| {
            GatewayError::Transport(format!("Gemini returned invalid JSON payload: {err}"))
        })
    }

    fn first_candidate_content(response: &Value) -> Option<&Value> {
        response
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .filter(|content| content.is_object())
    }

    fn content_parts(content: &Value) -> &[Value] {
        content
            .get("parts")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Concatenates the text parts of the first candidate. `None` when the
    /// response carries no candidate content at all.
    fn extract_text(response: &Value) -> Option<String> {
        let content = Self::first_candidate_content(response)?;
        Some(
            Self::content_parts(content)
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<&str>>()
                .join(""),
        )
    }

    /// Empty text falls back to the default prompt; a response without
    /// candidate content is a failed description.
    fn prompt_from_response(response: &Value) -> Result<String, GatewayError> {
        let Some(text) = Self::extract_text(response) else {
            return Err(GatewayError::DescriptionFailed(format!(
                "no candidates in response{}",
                block_reason(response)
                    .map(|reason| format!(" (blocked: {reason})"))
                    .unwrap_or_default()
            )));
        };
        Ok(prompt_or_fallback(&text))
    }

    /// First part, in response order, that carries inline image data.
    fn extract_first_image(response: &Value) -> Result<ImageData, GatewayError> {
        let content =
            Self::first_candidate_content(response).ok_or(GatewayError::NoContentGenerated)?;
        for part in Self::content_parts(content) {
            let Some(inline) = part
                .get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(Value::as_object)
            else {
                continue;
            };
            let data = inline
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if data.is_empty() {
                continue;
            }
            let mime_type = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str);
            return Ok(ImageData::new(mime_type, data));
        }
        Err(GatewayError::NoImageInResponse)
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn describe(&self, title: &str, body: &str) -> Result<String, GatewayError> {
        let payload = Self::describe_payload(title, body);
        let response = self
            .post(&self.config.text_model, &payload)
            .await
            .map_err(|err| GatewayError::DescriptionFailed(err.to_string()))?;
        Self::prompt_from_response(&response)
    }

    async fn generate(&self, prompt: &str) -> Result<ImageData, GatewayError> {
        let payload = Self::generate_payload(prompt);
        let response = self.post(&self.config.image_model, &payload).await?;
        Self::extract_first_image(&response)
    }

    async fn edit(&self, base: &ImageData, command: &str) -> Result<ImageData, GatewayError> {
        let payload = Self::edit_payload(base, command);
        let response = self.post(&self.config.image_model, &payload).await?;
        Self::extract_first_image(&response)
    }
}

fn block_reason(response: &Value) -> Option<&str> {
    response
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
}

fn request_timeout_seconds(raw: Option<&str>) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(90.0)
        .clamp(15.0, 300.0)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use cover_contracts::{GatewayError, ImageData};
    use serde_json::{json, Value};

    use super::{
        block_reason, request_timeout_seconds, truncate_text, GeminiConfig, GeminiGateway,
    };
    use crate::gateway::{ModelGateway, FALLBACK_PROMPT};

    #[test]
    fn endpoint_prefixes_models_path() {
        let gateway = GeminiGateway::new(GeminiConfig::default());
        assert_eq!(
            gateway.endpoint_for_model("gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            gateway.endpoint_for_model(" models/custom "),
            "https://generativelanguage.googleapis.com/v1beta/models/custom:generateContent"
        );
    }

    #[test]
    fn image_payloads_pin_wide_aspect_ratio() {
        let payload = GeminiGateway::generate_payload("a lighthouse at dusk");
        assert_eq!(
            payload["generationConfig"]["imageConfig"]["aspectRatio"],
            json!("16:9")
        );
        assert_eq!(
            payload["generationConfig"]["responseModalities"],
            json!(["IMAGE"])
        );
        assert_eq!(
            payload["contents"][0]["parts"][0]["text"],
            json!("a lighthouse at dusk")
        );
    }

    #[test]
    fn edit_payload_sends_bare_payload() {
        let base = ImageData::new(Some("image/jpeg"), "data:image/jpeg;base64,QUJD");
        let payload = GeminiGateway::edit_payload(&base, "make it brighter");
        let parts = payload["contents"][0]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], json!("make it brighter"));
        assert_eq!(parts[1]["inlineData"]["mimeType"], json!("image/jpeg"));
        assert_eq!(parts[1]["inlineData"]["data"], json!("QUJD"));
        assert_eq!(
            payload["generationConfig"]["imageConfig"]["aspectRatio"],
            json!("16:9")
        );
    }

    #[test]
    fn describe_payload_embeds_instruction() {
        let payload = GeminiGateway::describe_payload("AI Trends 2025", "");
        let text = payload["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default();
        assert!(text.contains("Title: AI Trends 2025"));
        assert!(payload.get("generationConfig").is_none());
    }

    #[test]
    fn first_image_part_wins() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "here you go" },
                        { "inlineData": { "mimeType": "image/png", "data": "" } },
                        { "inline_data": { "mime_type": "image/webp", "data": "Rmlyc3Q=" } },
                        { "inlineData": { "mimeType": "image/png", "data": "U2Vjb25k" } },
                    ]
                }
            }]
        });
        let image = GeminiGateway::extract_first_image(&response).unwrap();
        assert_eq!(image.media_type(), "image/webp");
        assert_eq!(image.payload(), "Rmlyc3Q=");
    }

    #[test]
    fn missing_media_type_defaults_to_png() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": { "data": "QUJD" } }] } }]
        });
        let image = GeminiGateway::extract_first_image(&response).unwrap();
        assert_eq!(image.media_type(), "image/png");
    }

    #[test]
    fn empty_responses_map_to_typed_errors() {
        let no_candidates = json!({ "candidates": [] });
        assert_eq!(
            GeminiGateway::extract_first_image(&no_candidates),
            Err(GatewayError::NoContentGenerated)
        );
        let no_content = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert_eq!(
            GeminiGateway::extract_first_image(&no_content),
            Err(GatewayError::NoContentGenerated)
        );
        let text_only = json!({
            "candidates": [{ "content": { "parts": [{ "text": "I cannot draw that." }] } }]
        });
        assert_eq!(
            GeminiGateway::extract_first_image(&text_only),
            Err(GatewayError::NoImageInResponse)
        );
        assert_eq!(
            GeminiGateway::extract_first_image(&Value::Null),
            Err(GatewayError::NoContentGenerated)
        );
    }

    #[test]
    fn extract_text_joins_text_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "A neon " }, { "text": "skyline" }] } }]
        });
        assert_eq!(
            GeminiGateway::extract_text(&response).as_deref(),
            Some("A neon skyline")
        );
        let empty_parts = json!({ "candidates": [{ "content": { "parts": [] } }] });
        assert_eq!(
            GeminiGateway::extract_text(&empty_parts).as_deref(),
            Some("")
        );
        assert_eq!(GeminiGateway::extract_text(&json!({})), None);
        assert_eq!(GeminiGateway::extract_text(&json!("not an object")), None);
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert_eq!(GeminiGateway::extract_text(&blocked), None);
        assert_eq!(block_reason(&blocked), Some("SAFETY"));
        assert_eq!(block_reason(&json!({ "candidates": [] })), None);

        assert_eq!(
            GeminiGateway::prompt_from_response(&blocked),
            Err(GatewayError::DescriptionFailed(
                "no candidates in response (blocked: SAFETY)".to_string()
            ))
        );
        assert_eq!(
            GeminiGateway::prompt_from_response(&json!([1, 2])),
            Err(GatewayError::DescriptionFailed(
                "no candidates in response".to_string()
            ))
        );
    }

    #[test]
    fn empty_description_text_uses_fallback_prompt() {
        let response = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] });
        assert_eq!(
            GeminiGateway::prompt_from_response(&response),
            Ok(FALLBACK_PROMPT.to_string())
        );
    }

    #[test]
    fn timeout_has_default_and_clamps() {
        assert_eq!(request_timeout_seconds(None), 90.0);
        assert_eq!(request_timeout_seconds(Some("120")), 120.0);
        assert_eq!(request_timeout_seconds(Some("2")), 15.0);
        assert_eq!(request_timeout_seconds(Some("9000")), 300.0);
        assert_eq!(request_timeout_seconds(Some("soon")), 90.0);
    }

    #[test]
    fn truncate_text_marks_cut() {
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(truncate_text("abc", 3), "abc");
    }

    #[tokio::test]
    async fn missing_key_fails_describe_as_description_failed() {
        let gateway = GeminiGateway::new(GeminiConfig::default());
        let err = gateway.describe("Title", "Body").await.unwrap_err();
        assert!(matches!(err, GatewayError::DescriptionFailed(ref detail) if detail.contains("GEMINI_API_KEY")));

        let err = gateway.generate("prompt").await.unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }
}
