//! State deltas returned by handlers and their transactional commit

use super::state::SessionState;
use super::status::{OrderStatus, OrderType};
use crate::ledger::{Ledger, LedgerError, LedgerReport};
use thiserror::Error;

/// Changes a handler asks the engine to make to the session state.
///
/// Every field is optional; `None` leaves the corresponding state field
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    pub order_type: Option<OrderType>,
    pub order_status: Option<OrderStatus>,
    /// Cart update in the `add [..] remove [..]` mini-language
    pub cart_update: Option<String>,
    pub name_for_order: Option<String>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    #[must_use]
    pub fn order_status(mut self, status: OrderStatus) -> Self {
        self.order_status = Some(status);
        self
    }

    #[must_use]
    pub fn cart_update(mut self, update: impl Into<String>) -> Self {
        self.cart_update = Some(update.into());
        self
    }

    #[must_use]
    pub fn name_for_order(mut self, name: impl Into<String>) -> Self {
        self.name_for_order = Some(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Reasons a delta is refused. Nothing from a refused delta is committed.
#[derive(Debug, Error)]
pub enum DeltaError {
    #[error("order type is already {current}, refusing to change it to {requested}")]
    OrderTypeLocked {
        current: OrderType,
        requested: OrderType,
    },
    #[error("illegal order status transition {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error("invalid cart update: {0}")]
    Cart(#[from] LedgerError),
}

impl SessionState {
    /// Apply `delta` to a copy of this state.
    ///
    /// Fields are applied in order: order type, cart update, order status,
    /// customer name. Any failure discards the copy, so the caller either
    /// gets a fully updated state or an error and an untouched original.
    pub fn commit(&self, delta: &StateDelta, ledger: &Ledger) -> Result<SessionState, DeltaError> {
        self.commit_with_report(delta, ledger).map(|(next, _)| next)
    }

    /// Like [`commit`](Self::commit), also returning what the cart update
    /// did when the delta carried one.
    pub fn commit_with_report(
        &self,
        delta: &StateDelta,
        ledger: &Ledger,
    ) -> Result<(SessionState, Option<LedgerReport>), DeltaError> {
        let mut next = self.clone();

        if let Some(requested) = delta.order_type.filter(|t| t.is_known()) {
            if next.order_type.is_known() && next.order_type != requested {
                return Err(DeltaError::OrderTypeLocked {
                    current: next.order_type,
                    requested,
                });
            }
            next.order_type = requested;
        }

        let report = match delta.cart_update.as_deref() {
            Some(update) => Some(ledger.apply(update, &mut next)?),
            None => None,
        };

        if let Some(to) = delta.order_status {
            if !next.order_status.can_transition_to(to) {
                return Err(DeltaError::IllegalTransition {
                    from: next.order_status,
                    to,
                });
            }
            next.order_status = to;
        }

        if let Some(name) = delta.name_for_order.as_deref() {
            let name = name.trim();
            if !name.is_empty() {
                next.name_for_order = Some(name.to_string());
            }
        }

        Ok((next, report))
    }
}
