//! Takes items into the cart

use super::{conversation, parse_output};
use crate::catalog::Catalog;
use crate::handler::{Handler, HandlerContext, HandlerError, HandlerOutput};
use crate::llm::{ModelClient, ModelRequest};
use crate::router::HandlerName;
use crate::session::{OrderStatus, SessionState, StateDelta};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const INSTRUCTIONS: &str = r#"You take food orders from a customer at a restaurant.

# Instructions
- Only items from the MENU section can be ordered. If the customer asks for something else, answer "I'm sorry, we don't have <what they asked for>."
- If the customer asks for a burger without saying which, ask whether they want a King Burger or a Mini Burger.
- Answer price questions from the menu.
- The ORDER section lists what is already in the cart. Use the conversation for context but never re-apply earlier requests.
- If you were just handed the conversation and the customer has no request, ask what they would like.
- Put cart changes in order_update using exact menu names: `add [Item, Item]` and `remove [Item]`, several blocks allowed, e.g. `add [Mini Burger, French Fries] remove [King Burger]`. Leave it empty when nothing changes.
- When the customer says they are done, set order_finished to true and leave agent_response empty.

# Examples
CUSTOMER: Can I have a King burger?
ORDER: []
OUTPUT: {"agent_response": "Sure, a King Burger added. Anything else?", "order_update": "add [King Burger]", "order_finished": false}

CUSTOMER: Actually, drop the King burger.
ORDER: [King Burger, French Fries]
OUTPUT: {"agent_response": "Done, I removed the King Burger. Anything else?", "order_update": "remove [King Burger]", "order_finished": false}

CUSTOMER: That's it.
ORDER: [French Fries, Mini Burger]
OUTPUT: {"agent_response": "", "order_update": "", "order_finished": true}"#;

#[derive(Debug, Deserialize)]
struct Output {
    #[serde(default)]
    agent_response: String,
    #[serde(default)]
    order_update: String,
    #[serde(default)]
    order_finished: bool,
}

pub struct ItemSelectionHandler {
    model: Arc<dyn ModelClient>,
    catalog: Arc<Catalog>,
}

impl ItemSelectionHandler {
    pub fn new(model: Arc<dyn ModelClient>, catalog: Arc<Catalog>) -> Self {
        Self { model, catalog }
    }

    fn system_prompt(&self, state: &SessionState) -> String {
        format!(
            "{INSTRUCTIONS}\n\n# MENU\n{menu}\n# ORDER\n{cart}\n\n# ORDER_STATUS: {status}\n",
            menu = self.catalog.to_prompt_text(),
            cart = state.cart_summary(),
            status = state.order_status(),
        )
    }

    fn schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "agent_response": {"type": "STRING", "description": "Reply to the customer"},
                "order_update": {
                    "type": "STRING",
                    "description": "Cart changes such as `add [King Burger] remove [French Fries]`, empty if none"
                },
                "order_finished": {"type": "BOOLEAN", "description": "True once the customer is done ordering"}
            },
            "required": ["agent_response", "order_update", "order_finished"]
        })
    }
}

#[async_trait]
impl Handler for ItemSelectionHandler {
    fn name(&self) -> HandlerName {
        HandlerName::ITEM_SELECTION
    }

    async fn run(&self, ctx: &HandlerContext<'_>) -> Result<HandlerOutput, HandlerError> {
        let request = ModelRequest::new(self.system_prompt(ctx.state))
            .with_messages(conversation(ctx))
            .with_response_schema(Self::schema());
        let response = self.model.complete(&request).await?;
        let output: Output = parse_output(&self.name(), &response.text)?;
        tracing::debug!(
            order_update = %output.order_update,
            order_finished = output.order_finished,
            "Item selection output"
        );

        let status = if output.order_finished {
            OrderStatus::Finished
        } else {
            OrderStatus::InProgress
        };
        let mut delta = StateDelta::new().order_status(status);
        if !output.order_update.trim().is_empty() {
            delta = delta.cart_update(output.order_update);
        }

        // Confirmation speaks next, so a finished order gets no reply here
        let response = if output.order_finished {
            String::new()
        } else {
            output.agent_response
        };
        Ok(HandlerOutput::new(response, delta))
    }
}
