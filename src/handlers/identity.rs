//! Collects the customer's name once the order is confirmed

use super::{conversation, parse_output};
use crate::handler::{Handler, HandlerContext, HandlerError, HandlerOutput};
use crate::llm::{ModelClient, ModelRequest};
use crate::router::HandlerName;
use crate::session::{OrderStatus, StateDelta};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const ASK_NAME: &str = "Can I have a name for this order, please?";

const INSTRUCTIONS: &str = r#"You get the customer's name for their order.
Once the customer gives their name, answer "Alright, <their name>! Give me one second as I place the order." and put the name in name_for_order.
If the customer wants to change the order instead, leave agent_response empty and set requires_order_update to true.
Do not mention handing the conversation over.

Examples:
ASSISTANT: Can I have a name for this order, please?
CUSTOMER: john
OUTPUT: {"agent_response": "Alright, john! Give me one second as I place the order.", "name_for_order": "john", "requires_order_update": false}

ASSISTANT: Can I have a name for this order, please?
CUSTOMER: Oh, actually, can I remove the fries?
OUTPUT: {"agent_response": "", "name_for_order": "", "requires_order_update": true}"#;

#[derive(Debug, Deserialize)]
struct Output {
    #[serde(default)]
    agent_response: String,
    #[serde(default)]
    name_for_order: String,
    #[serde(default)]
    requires_order_update: bool,
}

pub struct IdentityHandler {
    model: Arc<dyn ModelClient>,
}

impl IdentityHandler {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    fn schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "agent_response": {"type": "STRING", "description": "Reply to the customer, empty if the order needs changes"},
                "name_for_order": {"type": "STRING", "description": "The customer's name"},
                "requires_order_update": {"type": "BOOLEAN", "description": "True if the customer wants to change the order"}
            },
            "required": ["agent_response", "name_for_order", "requires_order_update"]
        })
    }
}

#[async_trait]
impl Handler for IdentityHandler {
    fn name(&self) -> HandlerName {
        HandlerName::IDENTITY_COLLECTION
    }

    async fn run(&self, ctx: &HandlerContext<'_>) -> Result<HandlerOutput, HandlerError> {
        // A freshly confirmed order is answered without the model
        if ctx.state.order_status() == OrderStatus::Confirmed {
            return Ok(match ctx.state.name_for_order() {
                Some(name) => HandlerOutput::say(format!(
                    "Alright, {name}! Give me one second as I place the order."
                )),
                None => HandlerOutput::new(
                    ASK_NAME,
                    StateDelta::new().order_status(OrderStatus::GettingUserInfo),
                ),
            });
        }

        let system = format!("{INSTRUCTIONS}\n\norder status: {}\n", ctx.state.order_status());
        let request = ModelRequest::new(system)
            .with_messages(conversation(ctx))
            .with_response_schema(Self::schema());
        let response = self.model.complete(&request).await?;
        let output: Output = parse_output(&self.name(), &response.text)?;

        if output.requires_order_update {
            return Ok(HandlerOutput::silent(
                StateDelta::new().order_status(OrderStatus::InProgress),
            ));
        }

        let name = output.name_for_order.trim();
        if name.is_empty() {
            return Ok(HandlerOutput::say(output.agent_response));
        }

        tracing::info!(name = %name, "Captured name for order");
        Ok(HandlerOutput::new(
            output.agent_response,
            StateDelta::new()
                .name_for_order(name)
                .order_status(OrderStatus::Confirmed),
        ))
    }
}
