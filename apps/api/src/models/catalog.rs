use chrono::{DateTime, Utc};
use serde::Serialize;

/// A generative model the provider can serve. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    /// Short identifier, e.g. `gemini-2.5-flash`.
    pub name: String,
    /// Provider-qualified identifier, e.g. `models/gemini-2.5-flash`.
    pub full_name: String,
    pub display_name: String,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            full_name: format!("models/{name}"),
            name,
            display_name: display_name.into(),
        }
    }
}

/// Immutable view of the available models at one point in time.
///
/// Never mutated after construction; refreshes replace the whole value.
#[derive(Debug, Clone)]
pub struct ModelCatalogSnapshot {
    pub models: Vec<ModelDescriptor>,
    pub fetched_at: DateTime<Utc>,
    /// True when this is the built-in fallback rather than a provider listing.
    pub degraded: bool,
}

impl ModelCatalogSnapshot {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        Self {
            models,
            fetched_at: Utc::now(),
            degraded: false,
        }
    }

    pub fn fallback(models: Vec<ModelDescriptor>) -> Self {
        Self {
            degraded: true,
            ..Self::new(models)
        }
    }

    pub fn find(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.name == name)
    }
}

/// Fast, recommended tier. First choice when the requested model is unavailable.
pub const FLASH_TIER_MODEL: &str = "gemini-2.5-flash";
/// Higher quality tier. Second choice.
pub const PRO_TIER_MODEL: &str = "gemini-2.5-pro";
pub const LITE_TIER_MODEL: &str = "gemini-2.5-flash-lite";

/// Stable models with the labels shown in the model picker.
pub const CURATED_MODELS: &[(&str, &str)] = &[
    (FLASH_TIER_MODEL, "Gemini 2.5 Flash (빠름 · 권장)"),
    (PRO_TIER_MODEL, "Gemini 2.5 Pro (고품질)"),
    (LITE_TIER_MODEL, "Gemini 2.5 Flash Lite (경량)"),
];

pub fn curated_display_name(name: &str) -> Option<&'static str> {
    CURATED_MODELS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, label)| *label)
}

/// The catalog used when the provider cannot be reached and nothing is cached.
pub fn static_fallback_snapshot() -> ModelCatalogSnapshot {
    ModelCatalogSnapshot::fallback(
        CURATED_MODELS
            .iter()
            .map(|(name, label)| ModelDescriptor::new(*name, *label))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_fallback_has_three_curated_models() {
        let snapshot = static_fallback_snapshot();
        assert!(snapshot.degraded);
        let names: Vec<&str> = snapshot.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec![FLASH_TIER_MODEL, PRO_TIER_MODEL, LITE_TIER_MODEL]);
        assert_eq!(snapshot.models[0].full_name, "models/gemini-2.5-flash");
    }

    #[test]
    fn test_find_matches_on_short_name_only() {
        let snapshot = static_fallback_snapshot();
        assert!(snapshot.find("gemini-2.5-pro").is_some());
        assert!(snapshot.find("models/gemini-2.5-pro").is_none());
    }

    #[test]
    fn test_curated_display_name_unknown_is_none() {
        assert!(curated_display_name("gemini-1.0-ultra").is_none());
    }
}
