//! Order Flow - workflow orchestration for conversational food ordering
//!
//! A deterministic router picks which conversation handler runs next from
//! a shared session state; a bounded engine loop runs handlers, commits
//! their state deltas and decides whether to hand off, wait for the user
//! or finish. Cart changes go through the order ledger against a priced
//! catalog.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod handler;
pub mod handlers;
pub mod ledger;
pub mod llm;
pub mod router;
pub mod runtime;
pub mod session;

pub use catalog::{Catalog, CatalogItem, Price};
pub use engine::{EngineConfig, EngineError, Turn, TurnStatus, Utterance, WorkflowEngine};
pub use handler::{Handler, HandlerContext, HandlerError, HandlerOutput, HandlerRegistry};
pub use ledger::{Ledger, UnknownItemPolicy};
pub use router::{route, HandlerName, OrderRouter, Route, Router};
pub use runtime::{RuntimeError, RuntimeManager, SessionEvent};
pub use session::{OrderStatus, OrderType, Session, SessionPhase, SessionState, StateDelta};
