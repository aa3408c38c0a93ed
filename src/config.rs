//! Environment configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `GEMINI_API_KEY` | required unless `ORDER_FLOW_GATEWAY` is set |
//! | `ORDER_FLOW_MODEL` | `gemini-2.5-flash` |
//! | `ORDER_FLOW_<HANDLER>_MODEL` | `ORDER_FLOW_MODEL`, e.g. `ORDER_FLOW_MENU_AGENT_MODEL` |
//! | `ORDER_FLOW_GATEWAY` | public Gemini API |
//! | `ORDER_FLOW_MENU` | built-in "Fresh Burger" menu |
//! | `ORDER_FLOW_MAX_ITERATIONS` | 30 |
//! | `ORDER_FLOW_UNKNOWN_ITEMS` | `zero-price` (or `reject`) |
//! | `ORDER_FLOW_FALLBACK_MESSAGE` | built-in apology |

use crate::catalog::{Catalog, CatalogError};
use crate::engine::EngineConfig;
use crate::ledger::{Ledger, UnknownItemPolicy};
use crate::llm::ModelConfig;
use crate::router::HandlerName;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to load menu {path}: {source}")]
    Menu {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub models: ModelConfig,
    /// JSON catalog file; `None` uses the built-in menu
    pub menu_path: Option<PathBuf>,
    pub unknown_items: UnknownItemPolicy,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.models.api_key = get("GEMINI_API_KEY");
        config.models.gateway = get("ORDER_FLOW_GATEWAY");
        if let Some(model) = get("ORDER_FLOW_MODEL") {
            config.models.default_model = model;
        }
        for handler in [
            HandlerName::TYPE_SELECTION,
            HandlerName::ITEM_SELECTION,
            HandlerName::CONFIRMATION,
            HandlerName::IDENTITY_COLLECTION,
        ] {
            if let Some(model) = get(&handler_model_var(&handler)) {
                config.models.handler_models.insert(handler, model);
            }
        }

        config.menu_path = get("ORDER_FLOW_MENU").map(PathBuf::from);

        if let Some(value) = get("ORDER_FLOW_UNKNOWN_ITEMS") {
            config.unknown_items = value.parse().map_err(|reason| ConfigError::Invalid {
                var: "ORDER_FLOW_UNKNOWN_ITEMS",
                value: value.clone(),
                reason,
            })?;
        }

        if let Some(value) = get("ORDER_FLOW_MAX_ITERATIONS") {
            let invalid = |reason: String| ConfigError::Invalid {
                var: "ORDER_FLOW_MAX_ITERATIONS",
                value: value.clone(),
                reason,
            };
            let max: usize = value.trim().parse().map_err(|e| invalid(format!("{e}")))?;
            if max == 0 {
                return Err(invalid("must be at least 1".to_string()));
            }
            config.engine.max_iterations = max;
        }

        if let Some(message) = get("ORDER_FLOW_FALLBACK_MESSAGE") {
            config.engine.fallback_message = message;
        }

        Ok(config)
    }

    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        match &self.menu_path {
            Some(path) => Catalog::from_json_file(path).map_err(|source| ConfigError::Menu {
                path: path.clone(),
                source,
            }),
            None => Ok(Catalog::fresh_burger()),
        }
    }

    pub fn ledger(&self, catalog: Arc<Catalog>) -> Ledger {
        Ledger::new(catalog).with_unknown_item_policy(self.unknown_items)
    }
}

/// `menu_agent` -> `ORDER_FLOW_MENU_AGENT_MODEL`
fn handler_model_var(handler: &HandlerName) -> String {
    format!("ORDER_FLOW_{}_MODEL", handler.as_str().to_ascii_uppercase())
}
