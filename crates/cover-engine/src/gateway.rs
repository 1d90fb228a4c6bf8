use async_trait::async_trait;
use cover_contracts::{GatewayError, ImageData};

/// Upper bound on body characters sent to the describe stage.
pub const DESCRIBE_BODY_CHAR_CAP: usize = 5000;
pub const COVER_ASPECT_RATIO: &str = "16:9";
pub const FALLBACK_PROMPT: &str =
    "A clean, modern editorial illustration with soft gradients and abstract shapes, suitable as a wide blog header.";

/// Boundary over the external text and image models.
///
/// Each call is one request/response round trip. Implementations do not
/// retry and never mutate their inputs.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Turns blog text into a short visual prompt. Empty model output yields
    /// [`FALLBACK_PROMPT`]; any failure is a [`GatewayError::DescriptionFailed`].
    async fn describe(&self, title: &str, body: &str) -> Result<String, GatewayError>;

    async fn generate(&self, prompt: &str) -> Result<ImageData, GatewayError>;

    async fn edit(&self, base: &ImageData, command: &str) -> Result<ImageData, GatewayError>;
}

pub fn compose_describe_instruction(title: &str, body: &str) -> String {
    let title = title.trim();
    let title = if title.is_empty() { "(untitled)" } else { title };
    let body = truncate_chars(body.trim(), DESCRIBE_BODY_CHAR_CAP);
    format!(
        "You write prompts for an image generation model.\n\
         Read the blog post below and reply with a single concise prompt (under 50 words) \
         that visually describes a cover image for it. The image will be rendered at a \
         {COVER_ASPECT_RATIO} aspect ratio. Describe subjects, setting, style, colours and mood. \
         Do not include any text, letters or logos in the image. Reply with the prompt only.\n\n\
         Title: {title}\n\
         Content: {body}"
    )
}

pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Normalises raw describe output: trimmed, or the fallback when empty.
pub fn prompt_or_fallback(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FALLBACK_PROMPT.to_string();
    }
    trimmed.to_string()
}
