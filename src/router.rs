//! Routing: which handler takes the next step
//!
//! `route` is pure, deterministic and total. The engine calls it before
//! every step and again after every commit; when it names the handler that
//! just ran, the turn is over and the engine waits for the user.

#[cfg(test)]
mod proptests;

use crate::session::{OrderStatus, OrderType, SessionState};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Registry key of a conversation handler
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerName(Cow<'static, str>);

impl HandlerName {
    /// Asks whether the order is to-go or for-here
    pub const TYPE_SELECTION: HandlerName = HandlerName::from_static("preorder_agent");
    /// Takes items into the cart
    pub const ITEM_SELECTION: HandlerName = HandlerName::from_static("menu_agent");
    /// Reads the cart back and asks for confirmation
    pub const CONFIRMATION: HandlerName = HandlerName::from_static("confirmation_agent");
    /// Collects the customer's name
    pub const IDENTITY_COLLECTION: HandlerName = HandlerName::from_static("user_info_agent");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for HandlerName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// Outcome of a routing decision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Handler(HandlerName),
    /// The workflow is finished
    Terminal,
}

impl Route {
    pub fn handler(name: impl Into<HandlerName>) -> Self {
        Route::Handler(name.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Route::Terminal)
    }

    pub fn handler_name(&self) -> Option<&HandlerName> {
        match self {
            Route::Handler(name) => Some(name),
            Route::Terminal => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Handler(name) => name.fmt(f),
            Route::Terminal => f.write_str("done"),
        }
    }
}

/// Routing policy used by the engine.
///
/// Implemented for plain functions and closures so tests and alternative
/// workflows can supply their own policy.
pub trait Router: Send + Sync {
    fn route(&self, state: &SessionState) -> Route;
}

impl<F> Router for F
where
    F: Fn(&SessionState) -> Route + Send + Sync,
{
    fn route(&self, state: &SessionState) -> Route {
        self(state)
    }
}

/// The food-order routing policy
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderRouter;

impl Router for OrderRouter {
    fn route(&self, state: &SessionState) -> Route {
        let route = route(state);
        tracing::debug!(
            order_type = %state.order_type(),
            order_status = %state.order_status(),
            route = %route,
            "Routing decision"
        );
        route
    }
}

/// Pick the next handler for `state`. The first matching rule wins.
pub fn route(state: &SessionState) -> Route {
    if state.order_type() == OrderType::Unknown {
        return Route::Handler(HandlerName::TYPE_SELECTION);
    }

    match state.order_status() {
        OrderStatus::Unknown | OrderStatus::InProgress => {
            Route::Handler(HandlerName::ITEM_SELECTION)
        }
        OrderStatus::Finished => Route::Handler(HandlerName::CONFIRMATION),
        OrderStatus::Confirmed if state.name_for_order().is_none() => {
            Route::Handler(HandlerName::IDENTITY_COLLECTION)
        }
        OrderStatus::GettingUserInfo => Route::Handler(HandlerName::IDENTITY_COLLECTION),
        OrderStatus::Confirmed => Route::Terminal,
    }
}
