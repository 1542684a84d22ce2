//! Provider router: selects the LLM provider for a model identifier.
//!
//! Also the model factory the orchestrator asks for a model per job.

use parley_core::model::{LanguageModel, ModelFactory};
use parley_core::provider::Provider;
use parley_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::chat_model::ChatModel;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes model identifiers to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Sampling settings applied to every model this router creates.
    pub fn with_sampling(mut self, temperature: f32, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Resolve `provider:model` or a bare model name (default provider).
    ///
    /// A prefix that is not a registered provider is treated as part of the
    /// model name, so ids like `qwen:7b` still reach the default provider.
    pub fn resolve(&self, model_id: &str) -> Option<(Arc<dyn Provider>, String)> {
        if let Some((prefix, model)) = model_id.split_once(':')
            && let Some(provider) = self.get(prefix)
            && !model.is_empty()
        {
            return Some((provider, model.to_string()));
        }

        self.default_provider().map(|p| (p, model_id.to_string()))
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

impl ModelFactory for ProviderRouter {
    fn create(&self, model_id: &str) -> Result<Arc<dyn LanguageModel>> {
        let model_id = model_id.trim();
        if model_id.is_empty() {
            return Err(Error::config("missing model name"));
        }

        let (provider, model) = self.resolve(model_id).ok_or_else(|| {
            Error::config(format!(
                "no provider registered for model '{model_id}' (default '{}')",
                self.default_provider
            ))
        })?;

        debug!(provider = %provider.name(), %model, "Resolved model");

        let mut chat = ChatModel::new(provider, model).with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            chat = chat.with_max_tokens(max_tokens);
        }
        Ok(Arc::new(chat))
    }
}

/// Build providers from configuration.
///
/// Hosted providers need an API key; a missing one is a configuration error.
pub fn build_from_config(config: &parley_config::AppConfig) -> Result<ProviderRouter> {
    let mut router = ProviderRouter::new(&config.default_provider)
        .with_sampling(config.default_temperature, Some(config.default_max_tokens));

    let mut names: Vec<&String> = config.providers.keys().collect();
    if !config.providers.contains_key(&config.default_provider) {
        names.push(&config.default_provider);
    }

    for name in names {
        let provider_config = config.providers.get(name);
        let base_url = provider_config
            .and_then(|p| p.api_url.clone())
            .or_else(|| default_base_url(name))
            .ok_or_else(|| {
                Error::config(format!("provider '{name}' needs an api_url"))
            })?;

        let api_key = match config.api_key_for(name) {
            Some(key) if !key.is_empty() => key,
            _ if is_local(name) => String::new(),
            _ => {
                return Err(Error::config(format!(
                    "missing API key for provider '{name}' (set api_key or PARLEY_API_KEY)"
                )));
            }
        };

        let provider = OpenAiCompatProvider::new(name.as_str(), base_url, api_key)?;
        router.register(name.clone(), Arc::new(provider));
    }

    Ok(router)
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "dashscope" => "https://dashscope.aliyuncs.com/compatible-mode/v1",
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "ollama" => "http://localhost:11434/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_config::{AppConfig, ProviderConfig};

    fn router() -> ProviderRouter {
        let mut router = ProviderRouter::new("dashscope");
        router.register(
            "dashscope",
            Arc::new(OpenAiCompatProvider::dashscope("sk-test").unwrap()),
        );
        router.register(
            "ollama",
            Arc::new(OpenAiCompatProvider::ollama(None).unwrap()),
        );
        router
    }

    #[test]
    fn router_register_and_lookup() {
        let router = router();
        assert!(router.get("dashscope").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default_provider().is_some());
        assert_eq!(router.list().len(), 2);
    }

    #[test]
    fn resolve_uses_prefix_only_for_known_providers() {
        let router = router();

        let (p, model) = router.resolve("ollama:llama3").unwrap();
        assert_eq!(p.name(), "ollama");
        assert_eq!(model, "llama3");

        let (p, model) = router.resolve("qwen:7b").unwrap();
        assert_eq!(p.name(), "dashscope");
        assert_eq!(model, "qwen:7b");

        let (p, model) = router.resolve("qwen-plus").unwrap();
        assert_eq!(p.name(), "dashscope");
        assert_eq!(model, "qwen-plus");
    }

    #[test]
    fn empty_model_id_is_config_error() {
        let err = router().create("  ").err().unwrap();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("missing model name"));
    }

    #[test]
    fn create_returns_requested_model() {
        let model = router().create("qwen-max").unwrap();
        assert_eq!(model.model_id(), "qwen-max");
    }

    #[test]
    fn create_without_default_provider_fails() {
        let router = ProviderRouter::new("dashscope");
        assert!(router.create("qwen-plus").is_err());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("dashscope").unwrap().contains("aliyuncs.com"));
        assert!(default_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(default_base_url("mystery").is_none());
    }

    #[test]
    fn hosted_provider_without_key_is_rejected() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(err.to_string().contains("missing API key"));
    }

    #[test]
    fn build_with_key_and_local_provider() {
        let mut config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        config.providers.insert("ollama".into(), ProviderConfig::default());

        let router = build_from_config(&config).unwrap();
        assert!(router.default_provider().is_some());
        assert!(router.get("ollama").is_some());
    }

    #[test]
    fn unknown_provider_needs_url() {
        let config = AppConfig {
            api_key: Some("k".into()),
            default_provider: "mystery".into(),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_err());
    }
}
