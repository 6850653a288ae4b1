//! Reasoning-engine providers.

use std::sync::Arc;

pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod provider;

pub use provider::{Provider, ProviderError, Result};

use crate::config::Settings;

/// Provider names accepted by [`create_provider`], with a short description.
pub const AVAILABLE_PROVIDERS: &[(&str, &str)] = &[
    ("ollama", "Ollama HTTP"),
    ("gemini", "Google Gemini HTTP"),
    ("claude", "Anthropic Claude CLI"),
];

/// Provider factory. Unknown names fall back to ollama with a warning.
pub fn create_provider(name: &str, settings: &Settings) -> Arc<dyn Provider> {
    let models = &settings.models;
    match name {
        "gemini" => Arc::new(gemini::GeminiProvider::with_config(
            models.api_key.clone(),
            models.base_url.clone(),
            models.model.clone(),
        )),
        "claude" => Arc::new(claude::ClaudeProvider::with_model(models.model.clone())),
        "ollama" => Arc::new(ollama::OllamaProvider::with_config(
            models.base_url.clone(),
            models.model.clone(),
        )),
        other => {
            tracing::warn!("Unknown provider '{}', falling back to ollama", other);
            Arc::new(ollama::OllamaProvider::with_config(
                models.base_url.clone(),
                models.model.clone(),
            ))
        }
    }
}

/// Get the configured provider.
pub fn get_current_provider(settings: &Settings) -> Arc<dyn Provider> {
    create_provider(&settings.models.provider, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_honors_names() {
        let settings = Settings::default();
        for (name, _) in AVAILABLE_PROVIDERS {
            assert_eq!(create_provider(name, &settings).name(), *name);
        }
        assert_eq!(create_provider("mystery", &settings).name(), "ollama");
    }

    #[test]
    fn factory_passes_model_through() {
        let mut settings = Settings::default();
        settings.models.model = Some("gemini-2.0-pro".to_string());
        let provider = create_provider("gemini", &settings);
        assert_eq!(provider.default_model(), Some("gemini-2.0-pro"));
    }
}
