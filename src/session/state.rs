//! Session state threaded through every handler call

use super::status::{OrderStatus, OrderType};
use crate::catalog::Price;
use serde::{Deserialize, Serialize};

/// Fixed set of fields describing the progress of one order.
///
/// Only the engine mutates a live state, by committing handler deltas
/// (see [`SessionState::commit`]). Cart fields change only through the
/// ledger, which keeps `order_total` equal to the priced sum of
/// `current_order`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub(crate) order_type: OrderType,
    #[serde(default)]
    pub(crate) order_status: OrderStatus,
    #[serde(default)]
    pub(crate) current_order: Vec<String>,
    #[serde(default)]
    pub(crate) order_total: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) name_for_order: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    #[must_use]
    pub fn with_order_status(mut self, order_status: OrderStatus) -> Self {
        self.order_status = order_status;
        self
    }

    #[must_use]
    pub fn with_name_for_order(mut self, name: impl Into<String>) -> Self {
        self.name_for_order = Some(name.into());
        self
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn order_status(&self) -> OrderStatus {
        self.order_status
    }

    pub fn current_order(&self) -> &[String] {
        &self.current_order
    }

    pub fn order_total(&self) -> Price {
        self.order_total
    }

    /// The customer name, if one has been captured and is non-blank
    pub fn name_for_order(&self) -> Option<&str> {
        self.name_for_order
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Cart rendering used in prompts and logs: `[King Burger, French Fries]`
    pub fn cart_summary(&self) -> String {
        format!("[{}]", self.current_order.join(", "))
    }

    /// JSON dump for diagnostics
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
