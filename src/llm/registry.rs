//! Model clients per handler

use super::{GeminiClient, LoggingModel, ModelClient, ModelError, ModelErrorKind, DEFAULT_MODEL};
use crate::router::HandlerName;
use std::collections::HashMap;
use std::sync::Arc;

/// Which models to use and how to reach them
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: Option<String>,
    /// Proxy base URL (e.g. `http://localhost:8000`); it handles auth itself
    pub gateway: Option<String>,
    pub default_model: String,
    /// Per-handler model overrides
    pub handler_models: HashMap<HandlerName, String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            gateway: None,
            default_model: DEFAULT_MODEL.to_string(),
            handler_models: HashMap::new(),
        }
    }
}

impl ModelConfig {
    /// Model id for `handler`
    pub fn model_for(&self, handler: &HandlerName) -> &str {
        self.handler_models
            .get(handler)
            .map_or(self.default_model.as_str(), String::as_str)
    }
}

/// One logged client per distinct model id
pub struct ModelRegistry {
    clients: HashMap<String, Arc<dyn ModelClient>>,
    default_model: String,
    handler_models: HashMap<HandlerName, String>,
}

impl ModelRegistry {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        // In gateway mode the gateway authenticates
        let api_key = match (&config.gateway, &config.api_key) {
            (Some(_), _) => "implicit".to_string(),
            (None, Some(key)) if !key.trim().is_empty() => key.clone(),
            (None, _) => {
                return Err(ModelError::new(
                    ModelErrorKind::Credentials,
                    "GEMINI_API_KEY is not set",
                ))
            }
        };

        let mut registry = Self {
            clients: HashMap::new(),
            default_model: config.default_model.clone(),
            handler_models: config.handler_models.clone(),
        };

        let model_ids = std::iter::once(&config.default_model).chain(config.handler_models.values());
        for model_id in model_ids {
            if registry.clients.contains_key(model_id) {
                continue;
            }
            let client = GeminiClient::new(&api_key, model_id, config.gateway.as_deref())?;
            registry.insert(Arc::new(LoggingModel::new(Arc::new(client))));
        }

        Ok(registry)
    }

    /// Registry over ready-made clients, keyed by their model ids
    pub fn from_clients(
        default: Arc<dyn ModelClient>,
        handler_models: HashMap<HandlerName, String>,
    ) -> Self {
        let mut registry = Self {
            clients: HashMap::new(),
            default_model: default.model_id().to_string(),
            handler_models,
        };
        registry.insert(default);
        registry
    }

    pub fn insert(&mut self, client: Arc<dyn ModelClient>) {
        self.clients.insert(client.model_id().to_string(), client);
    }

    pub fn get(&self, model_id: &str) -> Option<Arc<dyn ModelClient>> {
        self.clients.get(model_id).cloned()
    }

    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// Client for `handler`, falling back to the default model
    pub fn for_handler(&self, handler: &HandlerName) -> Option<Arc<dyn ModelClient>> {
        self.handler_models
            .get(handler)
            .and_then(|model_id| self.get(model_id))
            .or_else(|| self.get(&self.default_model))
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.clients.keys().cloned().collect();
        models.sort();
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::MockModelClient;

    #[test]
    fn test_no_api_key_no_gateway_is_an_error() {
        let err = ModelRegistry::new(&ModelConfig::default()).err().unwrap();
        assert_eq!(err.kind, crate::llm::ModelErrorKind::Credentials);

        let config = ModelConfig {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(ModelRegistry::new(&config).is_err());
    }

    #[test]
    fn test_gateway_needs_no_key() {
        let config = ModelConfig {
            gateway: Some("http://localhost:8000".to_string()),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config).unwrap();
        assert_eq!(registry.available_models(), vec![DEFAULT_MODEL.to_string()]);
    }

    #[test]
    fn test_handler_overrides_share_clients() {
        let config = ModelConfig {
            api_key: Some("key".to_string()),
            handler_models: HashMap::from([
                (HandlerName::ITEM_SELECTION, "gemini-2.5-pro".to_string()),
                (HandlerName::CONFIRMATION, DEFAULT_MODEL.to_string()),
            ]),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config).unwrap();
        assert_eq!(
            registry.available_models(),
            vec!["gemini-2.5-flash".to_string(), "gemini-2.5-pro".to_string()]
        );

        let menu = registry.for_handler(&HandlerName::ITEM_SELECTION).unwrap();
        assert_eq!(menu.model_id(), "gemini-2.5-pro");
        let preorder = registry.for_handler(&HandlerName::TYPE_SELECTION).unwrap();
        assert_eq!(preorder.model_id(), DEFAULT_MODEL);
        assert_eq!(config.model_for(&HandlerName::ITEM_SELECTION), "gemini-2.5-pro");
    }

    #[test]
    fn test_from_clients_falls_back_to_default() {
        let default: Arc<dyn ModelClient> = Arc::new(MockModelClient::new("mock-default"));
        let overrides = HashMap::from([(HandlerName::CONFIRMATION, "missing-model".to_string())]);
        let registry = ModelRegistry::from_clients(default, overrides);

        let client = registry.for_handler(&HandlerName::CONFIRMATION).unwrap();
        assert_eq!(client.model_id(), "mock-default");
        assert_eq!(registry.default_model_id(), "mock-default");
    }
}
