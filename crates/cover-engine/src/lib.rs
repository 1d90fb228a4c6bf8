pub mod dryrun;
pub mod export;
pub mod gateway;
pub mod gemini;
pub mod orchestrator;
pub mod session;

use anyhow::{bail, Result};
use cover_contracts::models::{Capability, ModelSelector, ModelSpec};

pub use dryrun::DryrunGateway;
pub use export::export_image;
pub use gateway::ModelGateway;
pub use gemini::{GeminiConfig, GeminiGateway};
pub use orchestrator::Orchestrator;
pub use session::{Job, Session, Stage, StageOutput, Step};

/// Resolved text/image model pair. Both models are served by one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPlan {
    pub provider: String,
    pub text_model: ModelSpec,
    pub image_model: ModelSpec,
    pub notes: Vec<String>,
}

impl GatewayPlan {
    pub fn build(&self) -> Result<Box<dyn ModelGateway>> {
        match self.provider.as_str() {
            "gemini" => Ok(Box::new(GeminiGateway::new(GeminiConfig::from_env(
                &self.text_model.name,
                &self.image_model.name,
            )))),
            "dryrun" => Ok(Box::new(DryrunGateway::new())),
            other => bail!("no gateway available for provider '{other}'"),
        }
    }
}

/// The image model must both generate and edit, and decides the provider.
/// The text model is then picked from that provider. Fallbacks are reported
/// in `notes`.
pub fn plan_gateway(
    selector: &ModelSelector,
    text_model: Option<&str>,
    image_model: Option<&str>,
) -> Result<GatewayPlan> {
    let mut notes = Vec::new();

    let image = selector
        .select(image_model, Capability::Image)
        .map_err(anyhow::Error::msg)?;
    if !image.model.supports(Capability::Edit) {
        bail!(
            "image model '{}' cannot edit images; pick one with the '{}' capability",
            image.model.name,
            Capability::Edit
        );
    }
    if image_model.is_some() {
        notes.extend(image.fallback_reason);
    }
    let provider = image.model.provider.clone();

    let text = selector
        .select_for_provider(text_model, Capability::Text, Some(&provider))
        .map_err(anyhow::Error::msg)?;
    if text_model.is_some() {
        notes.extend(text.fallback_reason);
    }

    tracing::debug!(
        provider = %provider,
        text_model = %text.model.name,
        image_model = %image.model.name,
        "planned gateway"
    );
    Ok(GatewayPlan {
        provider,
        text_model: text.model,
        image_model: image.model,
        notes,
    })
}

#[cfg(test)]
mod tests {
    use cover_contracts::models::{Capability, ModelRegistry, ModelSelector, ModelSpec};
    use indexmap::IndexMap;

    use super::plan_gateway;

    #[test]
    fn defaults_to_gemini_pair() -> anyhow::Result<()> {
        let plan = plan_gateway(&ModelSelector::new(None), None, None)?;
        assert_eq!(plan.provider, "gemini");
        assert_eq!(plan.text_model.name, "gemini-2.5-flash");
        assert_eq!(plan.image_model.name, "gemini-2.5-flash-image");
        assert!(plan.notes.is_empty());
        Ok(())
    }

    #[test]
    fn dryrun_image_model_pulls_dryrun_text_model() -> anyhow::Result<()> {
        let plan = plan_gateway(
            &ModelSelector::new(None),
            Some("gemini-2.5-flash"),
            Some("dryrun-image-1"),
        )?;
        assert_eq!(plan.provider, "dryrun");
        assert_eq!(plan.text_model.name, "dryrun-text-1");
        assert_eq!(plan.notes.len(), 1);
        assert!(plan.notes[0].contains("'gemini-2.5-flash'"));

        let gateway = plan.build()?;
        assert_eq!(gateway.name(), "dryrun");
        Ok(())
    }

    #[test]
    fn unknown_image_model_falls_back_with_note() -> anyhow::Result<()> {
        let plan = plan_gateway(&ModelSelector::new(None), None, Some("imagen-9"))?;
        assert_eq!(plan.image_model.name, "gemini-2.5-flash-image");
        assert_eq!(plan.notes.len(), 1);
        assert!(plan.notes[0].contains("'imagen-9'"));
        Ok(())
    }

    #[test]
    fn image_model_without_edit_is_rejected() {
        let mut models = IndexMap::new();
        for (name, capabilities) in [
            ("draw-only", vec![Capability::Image]),
            ("writer", vec![Capability::Text]),
        ] {
            models.insert(
                name.to_string(),
                ModelSpec {
                    name: name.to_string(),
                    provider: "dryrun".to_string(),
                    capabilities,
                },
            );
        }
        let selector = ModelSelector::new(Some(ModelRegistry::new(Some(models))));
        let err = plan_gateway(&selector, None, Some("draw-only")).unwrap_err();
        assert!(err.to_string().contains("cannot edit images"));
    }

    #[test]
    fn gemini_plan_builds_gemini_gateway() -> anyhow::Result<()> {
        let plan = plan_gateway(&ModelSelector::new(None), None, Some("gemini-3-pro-image-preview"))?;
        assert_eq!(plan.text_model.name, "gemini-2.5-flash");
        assert_eq!(plan.build()?.name(), "gemini");
        Ok(())
    }
}
