use serde::{Deserialize, Serialize};

use crate::image::ImageData;

/// How an artifact came to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactOrigin {
    Generated { prompt: String },
    Edited { command: String, base: usize },
}

/// One produced image. Immutable once it lands in the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    image: ImageData,
    origin: ArtifactOrigin,
}

impl Artifact {
    pub fn generated(image: ImageData, prompt: impl Into<String>) -> Self {
        Self {
            image,
            origin: ArtifactOrigin::Generated {
                prompt: prompt.into(),
            },
        }
    }

    pub fn edited(image: ImageData, command: impl Into<String>, base: usize) -> Self {
        Self {
            image,
            origin: ArtifactOrigin::Edited {
                command: command.into(),
                base,
            },
        }
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }

    pub fn origin(&self) -> &ArtifactOrigin {
        &self.origin
    }

    pub fn label(&self) -> String {
        match &self.origin {
            ArtifactOrigin::Generated { prompt } => format!("generated: {prompt}"),
            ArtifactOrigin::Edited { command, base } => format!("edit of #{base}: {command}"),
        }
    }
}
