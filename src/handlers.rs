//! Built-in food-order handlers
//!
//! Each handler prompts the model for a JSON object, validates it against
//! its output type and turns it into a [`StateDelta`](crate::session::StateDelta).
//! Output that does not parse is a validation error; nothing is committed.

mod confirmation;
mod identity;
mod item_selection;
mod type_selection;

pub use confirmation::ConfirmationHandler;
pub use identity::IdentityHandler;
pub use item_selection::ItemSelectionHandler;
pub use type_selection::TypeSelectionHandler;

use crate::catalog::Catalog;
use crate::handler::{HandlerContext, HandlerError, HandlerRegistry};
use crate::llm::{ModelClient, ModelMessage};
use crate::router::HandlerName;
use crate::session::Speaker;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Sent when a handler takes over without new user input, so the model
/// always answers a user turn.
const HANDOFF_NOTE: &str = "(The conversation has been handed to you. Continue with your task.)";

/// Registry holding the four food-order handlers.
///
/// `model_for` picks the model client for each handler, so handlers can
/// run on different models.
pub fn standard_registry<F>(model_for: F, catalog: Arc<Catalog>) -> HandlerRegistry
where
    F: Fn(&HandlerName) -> Arc<dyn ModelClient>,
{
    HandlerRegistry::new()
        .with_handler(Arc::new(TypeSelectionHandler::new(model_for(
            &HandlerName::TYPE_SELECTION,
        ))))
        .with_handler(Arc::new(ItemSelectionHandler::new(
            model_for(&HandlerName::ITEM_SELECTION),
            catalog,
        )))
        .with_handler(Arc::new(ConfirmationHandler::new(model_for(
            &HandlerName::CONFIRMATION,
        ))))
        .with_handler(Arc::new(IdentityHandler::new(model_for(
            &HandlerName::IDENTITY_COLLECTION,
        ))))
}

/// Transcript as model messages, ending on a user turn.
///
/// Empty assistant entries are dropped.
pub(crate) fn conversation(ctx: &HandlerContext<'_>) -> Vec<ModelMessage> {
    let mut messages: Vec<ModelMessage> = ctx
        .transcript
        .iter()
        .filter(|entry| !entry.text.trim().is_empty())
        .map(|entry| match entry.speaker {
            Speaker::User => ModelMessage::user(&entry.text),
            Speaker::Assistant => ModelMessage::assistant(&entry.text),
        })
        .collect();

    let ends_on_user = messages
        .last()
        .is_some_and(|m| m.role == crate::llm::MessageRole::User);
    if !ends_on_user {
        messages.push(ModelMessage::user(HANDOFF_NOTE));
    }
    messages
}

/// Parse the model's JSON answer, tolerating a surrounding code fence
pub(crate) fn parse_output<T: DeserializeOwned>(
    handler: &HandlerName,
    text: &str,
) -> Result<T, HandlerError> {
    let json = strip_code_fence(text);
    serde_json::from_str(json).map_err(|e| {
        tracing::warn!(handler = %handler, error = %e, output = %text, "Model output failed validation");
        HandlerError::Validation(format!("{handler}: {e}"))
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}
