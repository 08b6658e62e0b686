use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ChatError, Result};

/// Fallback order used when no model is configured explicitly.
pub const DEFAULT_MODEL_CANDIDATES: [&str; 4] = [
    "gemini-2.5-flash",
    "gemini-2.0-flash-001",
    "gemini-flash-latest",
    "gemini-2.0-flash",
];

pub fn default_model_candidates() -> Vec<String> {
    DEFAULT_MODEL_CANDIDATES
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Returns the first candidate whose probe succeeds, trying them in order.
pub fn select_first_available<P>(candidates: &[String], mut probe: P) -> Result<String>
where
    P: FnMut(&str) -> anyhow::Result<()>,
{
    for candidate in candidates {
        match probe(candidate) {
            Ok(()) => {
                info!("using model {candidate}");
                return Ok(candidate.clone());
            }
            Err(err) => debug!("model {candidate} unavailable: {err:#}"),
        }
    }
    Err(ChatError::ModelUnavailable {
        tried: candidates.to_vec(),
    })
}

pub const GENERATE_CONTENT: &str = "generateContent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Name without the `models/` resource prefix.
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|method| method == GENERATE_CONTENT)
    }

    /// Rough pricing bucket guessed from the model name.
    pub fn tier(&self) -> ModelTier {
        let lower = self.short_name().to_lowercase();
        if lower.contains("flash") || lower.contains("1.0") {
            ModelTier::Free
        } else {
            ModelTier::Paid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Free,
    Paid,
}

#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    pub free: Vec<ModelInfo>,
    pub paid: Vec<ModelInfo>,
}

impl ModelCatalog {
    /// Keeps only text-generation models and splits them by tier,
    /// preserving the service's order.
    pub fn classify(models: impl IntoIterator<Item = ModelInfo>) -> Self {
        let mut catalog = Self::default();
        for model in models.into_iter().filter(ModelInfo::supports_generation) {
            match model.tier() {
                ModelTier::Free => catalog.free.push(model),
                ModelTier::Paid => catalog.paid.push(model),
            }
        }
        catalog
    }

    pub fn total(&self) -> usize {
        self.free.len() + self.paid.len()
    }

    pub fn generation_model_names(&self) -> Vec<String> {
        self.free
            .iter()
            .chain(self.paid.iter())
            .map(|model| model.short_name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn model(name: &str, methods: &[&str]) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            display_name: None,
            description: None,
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn first_working_candidate_wins() {
        let candidates = default_model_candidates();
        let mut probed = Vec::new();
        let selected = select_first_available(&candidates, |name| {
            probed.push(name.to_string());
            if name == "gemini-flash-latest" {
                Ok(())
            } else {
                Err(anyhow!("404"))
            }
        })
        .unwrap();
        assert_eq!(selected, "gemini-flash-latest");
        assert_eq!(probed.len(), 3);
    }

    #[test]
    fn exhausting_candidates_reports_model_unavailable() {
        let candidates = vec!["a".to_string(), "b".to_string()];
        let err = select_first_available(&candidates, |_| Err(anyhow!("nope"))).unwrap_err();
        match err {
            ChatError::ModelUnavailable { tried } => assert_eq!(tried, candidates),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn catalog_filters_and_classifies() {
        let catalog = ModelCatalog::classify(vec![
            model("models/gemini-2.5-flash", &["generateContent", "countTokens"]),
            model("models/gemini-2.5-pro", &["generateContent"]),
            model("models/text-embedding-004", &["embedContent"]),
            model("models/gemini-1.0-pro", &["generateContent"]),
        ]);
        let free: Vec<_> = catalog.free.iter().map(|m| m.short_name()).collect();
        let paid: Vec<_> = catalog.paid.iter().map(|m| m.short_name()).collect();
        assert_eq!(free, vec!["gemini-2.5-flash", "gemini-1.0-pro"]);
        assert_eq!(paid, vec!["gemini-2.5-pro"]);
        assert_eq!(catalog.total(), 3);
    }
}
