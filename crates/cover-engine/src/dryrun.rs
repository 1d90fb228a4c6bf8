use std::io::Cursor;

use async_trait::async_trait;
use cover_contracts::{GatewayError, ImageData};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};

use crate::gateway::{truncate_chars, ModelGateway, COVER_ASPECT_RATIO};

pub const DRYRUN_WIDTH: u32 = 1024;
pub const DRYRUN_HEIGHT: u32 = 576;

const DRYRUN_BODY_WORDS: usize = 12;

/// Offline gateway: deterministic prompts and flat-colour 16:9 PNGs.
#[derive(Debug, Clone, Default)]
pub struct DryrunGateway;

impl DryrunGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelGateway for DryrunGateway {
    fn name(&self) -> &str {
        "dryrun"
    }

    async fn describe(&self, title: &str, body: &str) -> Result<String, GatewayError> {
        let subject = if title.trim().is_empty() {
            body.split_whitespace()
                .take(DRYRUN_BODY_WORDS)
                .collect::<Vec<&str>>()
                .join(" ")
        } else {
            truncate_chars(title.trim(), 120).to_string()
        };
        Ok(format!(
            "Editorial {COVER_ASPECT_RATIO} cover illustration about \"{subject}\", bold shapes, soft light"
        ))
    }

    async fn generate(&self, prompt: &str) -> Result<ImageData, GatewayError> {
        render_flat_png(color_from_seed(&[prompt.as_bytes()]))
    }

    async fn edit(&self, base: &ImageData, command: &str) -> Result<ImageData, GatewayError> {
        render_flat_png(color_from_seed(&[
            base.bare_payload().as_bytes(),
            command.as_bytes(),
        ]))
    }
}

fn color_from_seed(chunks: &[&[u8]]) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

fn render_flat_png((r, g, b): (u8, u8, u8)) -> Result<ImageData, GatewayError> {
    let image = RgbImage::from_pixel(DRYRUN_WIDTH, DRYRUN_HEIGHT, Rgb([r, g, b]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|err| GatewayError::Transport(format!("dryrun image encode failed: {err}")))?;
    Ok(ImageData::from_bytes(Some("image/png"), &bytes.into_inner()))
}

#[cfg(test)]
mod tests {
    use cover_contracts::ImageData;

    use super::{DryrunGateway, DRYRUN_HEIGHT, DRYRUN_WIDTH};
    use crate::gateway::ModelGateway;

    fn dimensions(image: &ImageData) -> anyhow::Result<(u32, u32)> {
        let decoded = image::load_from_memory(&image.decode_bytes()?)?;
        Ok((decoded.width(), decoded.height()))
    }

    #[tokio::test]
    async fn describe_prefers_title_then_body() -> anyhow::Result<()> {
        let gateway = DryrunGateway::new();
        let titled = gateway.describe("AI Trends 2025", "ignored body").await?;
        assert!(titled.contains("\"AI Trends 2025\""));
        assert!(titled.contains("16:9"));

        let untitled = gateway.describe("", "one two three").await?;
        assert!(untitled.contains("\"one two three\""));
        Ok(())
    }

    #[tokio::test]
    async fn generate_renders_wide_png() -> anyhow::Result<()> {
        let gateway = DryrunGateway::new();
        let image = gateway.generate("a lighthouse").await?;
        assert_eq!(image.media_type(), "image/png");
        assert_eq!(dimensions(&image)?, (DRYRUN_WIDTH, DRYRUN_HEIGHT));
        assert_eq!(image, gateway.generate("a lighthouse").await?);
        Ok(())
    }

    #[tokio::test]
    async fn edit_depends_on_base_and_command() -> anyhow::Result<()> {
        let gateway = DryrunGateway::new();
        let base = gateway.generate("a lighthouse").await?;
        let brighter = gateway.edit(&base, "make it brighter").await?;
        let sunset = gateway.edit(&base, "add sunset").await?;
        assert_ne!(brighter, sunset);
        assert_eq!(dimensions(&brighter)?, (DRYRUN_WIDTH, DRYRUN_HEIGHT));

        let prefixed = ImageData::new(Some("image/png"), base.to_data_url());
        assert_eq!(gateway.edit(&prefixed, "make it brighter").await?, brighter);
        Ok(())
    }
}
