//! Reads the cart back and asks the customer to confirm it

use super::{conversation, parse_output};
use crate::handler::{Handler, HandlerContext, HandlerError, HandlerOutput};
use crate::llm::{ModelClient, ModelRequest};
use crate::router::HandlerName;
use crate::session::{OrderStatus, SessionState, StateDelta};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const INSTRUCTIONS: &str = r#"You help the customer confirm their order.

Give a short summary of the items in the cart with the total and ask whether the order is correct.
- If the customer confirms, leave agent_response empty and set order_confirmed to "true".
- If the customer wants to change something, set order_confirmed to "false".
- Otherwise (no answer yet, or they want to hear it again) repeat the summary with order_confirmed "unknown".

Example:
OUTPUT: {"agent_response": "Alright, one King Burger and French Fries, that's $12.98. Would that be all for today?", "order_confirmed": "unknown"}
CUSTOMER: that's it
OUTPUT: {"agent_response": "", "order_confirmed": "true"}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Confirmed {
    True,
    False,
    Unknown,
}

#[derive(Debug, Deserialize)]
struct Output {
    #[serde(default)]
    agent_response: String,
    order_confirmed: Confirmed,
}

pub struct ConfirmationHandler {
    model: Arc<dyn ModelClient>,
}

impl ConfirmationHandler {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    fn system_prompt(state: &SessionState) -> String {
        format!(
            "{INSTRUCTIONS}\n\nCurrent cart: {cart}\nOrder total: ${total}\n",
            cart = state.cart_summary(),
            total = state.order_total(),
        )
    }

    fn schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "agent_response": {"type": "STRING", "description": "Reply to the customer"},
                "order_confirmed": {
                    "type": "STRING",
                    "enum": ["true", "false", "unknown"],
                    "description": "true if confirmed, false if the customer wants changes, unknown otherwise"
                }
            },
            "required": ["agent_response", "order_confirmed"]
        })
    }
}

#[async_trait]
impl Handler for ConfirmationHandler {
    fn name(&self) -> HandlerName {
        HandlerName::CONFIRMATION
    }

    async fn run(&self, ctx: &HandlerContext<'_>) -> Result<HandlerOutput, HandlerError> {
        let request = ModelRequest::new(Self::system_prompt(ctx.state))
            .with_messages(conversation(ctx))
            .with_response_schema(Self::schema());
        let response = self.model.complete(&request).await?;
        let output: Output = parse_output(&self.name(), &response.text)?;
        tracing::debug!(order_confirmed = ?output.order_confirmed, "Confirmation output");

        let delta = match output.order_confirmed {
            Confirmed::True => StateDelta::new().order_status(OrderStatus::Confirmed),
            Confirmed::False => StateDelta::new().order_status(OrderStatus::InProgress),
            Confirmed::Unknown => StateDelta::new(),
        };
        Ok(HandlerOutput::new(output.agent_response, delta))
    }
}
