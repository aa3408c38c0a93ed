//! Order ledger: cart mutation against the catalog
//!
//! The ledger is the only code that touches `current_order` and
//! `order_total`. An update is parsed in full before anything is applied,
//! so a malformed update never leaves a half-applied cart behind.

mod parser;

#[cfg(test)]
mod proptests;

pub use parser::{parse, CartCommand, ParseError, Verb};

use crate::catalog::{Catalog, Price};
use crate::session::SessionState;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// What to do when an `add` names an item the catalog doesn't know
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownItemPolicy {
    /// Add the item at price zero
    #[default]
    ZeroPrice,
    /// Leave the item out of the cart
    Reject,
}

impl FromStr for UnknownItemPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero-price" | "zero_price" | "zero" => Ok(Self::ZeroPrice),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown item policy {other:?} (expected 'zero-price' or 'reject')"
            )),
        }
    }
}

impl fmt::Display for UnknownItemPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ZeroPrice => "zero-price",
            Self::Reject => "reject",
        })
    }
}

/// Summary of what an update actually did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// `add`s that missed the catalog (priced zero or rejected, per policy)
    pub unknown: Vec<String>,
    /// `remove`s of items that were not in the cart
    pub missing: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    catalog: Arc<Catalog>,
    unknown_items: UnknownItemPolicy,
}

impl Ledger {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            unknown_items: UnknownItemPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_unknown_item_policy(mut self, policy: UnknownItemPolicy) -> Self {
        self.unknown_items = policy;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn unknown_item_policy(&self) -> UnknownItemPolicy {
        self.unknown_items
    }

    /// Parse `update` and apply it to the cart in `state`.
    pub fn apply(&self, update: &str, state: &mut SessionState) -> Result<LedgerReport, LedgerError> {
        let commands = parse(update)?;
        Ok(self.apply_commands(&commands, state))
    }

    /// Apply already-parsed commands left to right. Never fails: unknown
    /// items follow the configured policy and absent removals are ignored.
    pub fn apply_commands(&self, commands: &[CartCommand], state: &mut SessionState) -> LedgerReport {
        let mut report = LedgerReport::default();

        for command in commands {
            match command.verb {
                Verb::Add => {
                    for item in &command.items {
                        self.add_item(item, state, &mut report);
                    }
                }
                Verb::Remove => {
                    for item in &command.items {
                        Self::remove_item(&self.catalog, item, state, &mut report);
                    }
                }
            }
        }

        report
    }

    /// Bring a state that did not come through the ledger (e.g. one a
    /// caller persisted and deserialized) in line with the catalog.
    /// `order_total` is recomputed from the cart; under
    /// [`UnknownItemPolicy::Reject`] unknown items are dropped first.
    /// Returns whether anything changed.
    pub fn reconcile(&self, state: &mut SessionState) -> bool {
        let mut changed = false;

        if self.unknown_items == UnknownItemPolicy::Reject {
            let before = state.current_order.len();
            state.current_order.retain(|item| self.catalog.contains(item));
            if state.current_order.len() != before {
                tracing::warn!(
                    dropped = before - state.current_order.len(),
                    "Dropped items missing from the catalog"
                );
                changed = true;
            }
        }

        let total = priced_total(&self.catalog, &state.current_order);
        if total != state.order_total {
            tracing::warn!(
                stored = %state.order_total,
                priced = %total,
                "Order total disagrees with the cart, using the priced total"
            );
            state.order_total = total;
            changed = true;
        }

        changed
    }

    fn add_item(&self, item: &str, state: &mut SessionState, report: &mut LedgerReport) {
        let price = if let Some(price) = self.catalog.price(item) {
            price
        } else {
            report.unknown.push(item.to_string());
            match self.unknown_items {
                UnknownItemPolicy::ZeroPrice => {
                    tracing::warn!(item = %item, "Item not in catalog, adding at zero price");
                    Price::ZERO
                }
                UnknownItemPolicy::Reject => {
                    tracing::warn!(item = %item, "Item not in catalog, not adding");
                    return;
                }
            }
        };

        state.current_order.push(item.to_string());
        state.order_total = state.order_total.saturating_add(price);
        report.added.push(item.to_string());
    }

    fn remove_item(catalog: &Catalog, item: &str, state: &mut SessionState, report: &mut LedgerReport) {
        let Some(index) = state.current_order.iter().position(|i| i == item) else {
            tracing::warn!(item = %item, "Attempted to remove item which is not in the order");
            report.missing.push(item.to_string());
            return;
        };

        state.current_order.remove(index);
        let price = catalog.price(item).unwrap_or(Price::ZERO);
        state.order_total = state.order_total.saturating_sub(price);
        report.removed.push(item.to_string());
    }
}

/// Sum of catalog prices for `items`, unknown items counting as zero
pub fn priced_total(catalog: &Catalog, items: &[String]) -> Price {
    items
        .iter()
        .map(|item| catalog.price(item).unwrap_or(Price::ZERO))
        .fold(Price::ZERO, Price::saturating_add)
}
