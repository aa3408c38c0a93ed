//! Asks whether the order is to go or for here

use super::{conversation, parse_output};
use crate::handler::{Handler, HandlerContext, HandlerError, HandlerOutput};
use crate::llm::{ModelClient, ModelRequest};
use crate::router::HandlerName;
use crate::session::{OrderType, StateDelta};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const PROMPT: &str = "\
You work the counter at a restaurant. Before the customer orders, find out \
whether the order is to go or for here.
If the customer answers, set order_type to TO_GO or FOR_HERE and leave \
agent_response empty.
If the customer has not answered yet, greet them and politely ask whether \
the order is to go or for here, with order_type UNKNOWN.";

#[derive(Debug, Deserialize)]
struct Output {
    #[serde(default)]
    agent_response: String,
    #[serde(default)]
    order_type: OrderType,
    #[serde(default)]
    user_started_order: bool,
}

pub struct TypeSelectionHandler {
    model: Arc<dyn ModelClient>,
}

impl TypeSelectionHandler {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    fn schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "agent_response": {"type": "STRING", "description": "Reply to the customer"},
                "order_type": {
                    "type": "STRING",
                    "enum": ["TO_GO", "FOR_HERE", "UNKNOWN"],
                    "description": "TO_GO or FOR_HERE once the customer answered, UNKNOWN otherwise"
                },
                "user_started_order": {"type": "BOOLEAN", "description": "True if the customer already started ordering"}
            },
            "required": ["agent_response", "order_type", "user_started_order"]
        })
    }
}

#[async_trait]
impl Handler for TypeSelectionHandler {
    fn name(&self) -> HandlerName {
        HandlerName::TYPE_SELECTION
    }

    async fn run(&self, ctx: &HandlerContext<'_>) -> Result<HandlerOutput, HandlerError> {
        let request = ModelRequest::new(PROMPT)
            .with_messages(conversation(ctx))
            .with_response_schema(Self::schema());
        let response = self.model.complete(&request).await?;
        let output: Output = parse_output(&self.name(), &response.text)?;
        tracing::debug!(
            order_type = %output.order_type,
            user_started_order = output.user_started_order,
            "Type selection output"
        );

        let mut delta = StateDelta::new();
        if output.order_type.is_known() {
            delta = delta.order_type(output.order_type);
        }
        Ok(HandlerOutput::new(output.agent_response, delta))
    }
}
