use std::fmt;

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Text,
    Image,
    Edit,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Text => "text",
            Capability::Image => "image",
            Capability::Edit => "edit",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<Capability>,
}

impl ModelSpec {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    /// Models supporting `capability`, in registration order, optionally
    /// restricted to one provider.
    pub fn by_capability(&self, capability: Capability, provider: Option<&str>) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .filter(|model| provider.map_or(true, |name| model.provider == name))
            .cloned()
            .collect()
    }

    pub fn ensure(
        &self,
        name: &str,
        capability: Capability,
        provider: Option<&str>,
    ) -> Option<ModelSpec> {
        let model = self.get(name)?;
        if !model.supports(capability) {
            return None;
        }
        if provider.is_some_and(|expected| model.provider != expected) {
            return None;
        }
        Some(model.clone())
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, provider: &str, capabilities: &[Capability]| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                provider: provider.to_string(),
                capabilities: capabilities.to_vec(),
            },
        );
    };

    insert("gemini-2.5-flash", "gemini", &[Capability::Text]);
    insert(
        "gemini-2.5-flash-image",
        "gemini",
        &[Capability::Image, Capability::Edit],
    );
    insert("gemini-3-pro-preview", "gemini", &[Capability::Text]);
    insert(
        "gemini-3-pro-image-preview",
        "gemini",
        &[Capability::Image, Capability::Edit],
    );
    insert("dryrun-text-1", "dryrun", &[Capability::Text]);
    insert(
        "dryrun-image-1",
        "dryrun",
        &[Capability::Image, Capability::Edit],
    );

    map
}

#[cfg(test)]
mod tests {
    use super::{Capability, ModelRegistry};

    #[test]
    fn default_registry_pairs_text_and_image_models_per_provider() {
        let registry = ModelRegistry::new(None);
        let gemini_text = registry.by_capability(Capability::Text, Some("gemini"));
        assert_eq!(gemini_text[0].name, "gemini-2.5-flash");
        let dryrun_image = registry.by_capability(Capability::Edit, Some("dryrun"));
        assert_eq!(dryrun_image.len(), 1);
        assert_eq!(dryrun_image[0].name, "dryrun-image-1");
    }

    #[test]
    fn ensure_checks_capability_and_provider() {
        let registry = ModelRegistry::new(None);
        assert!(registry
            .ensure("gemini-2.5-flash-image", Capability::Edit, None)
            .is_some());
        assert!(registry
            .ensure("gemini-2.5-flash", Capability::Image, None)
            .is_none());
        assert!(registry
            .ensure("gemini-2.5-flash", Capability::Text, Some("dryrun"))
            .is_none());
        assert!(registry.ensure("missing", Capability::Text, None).is_none());
    }
}
