//! Workflow engine: the route / invoke / commit loop
//!
//! One call to [`WorkflowEngine::step`] handles one user utterance. The
//! engine routes, runs the handler, commits its delta and routes again:
//!
//! - same handler again: the turn is over, wait for the next utterance
//! - a different handler: hand off immediately, without new input
//! - terminal: the workflow is complete
//!
//! Only the first handler of a call sees the user's input. Hand-offs are
//! bounded by [`EngineConfig::max_iterations`]; hitting the bound means the
//! routing policy cycles and the session is aborted.

mod error;


pub use error::EngineError;

use crate::handler::{HandlerContext, HandlerError, HandlerRegistry};
use crate::ledger::Ledger;
use crate::router::{HandlerName, OrderRouter, Route, Router};
use crate::session::{Session, SessionPhase, SessionState};
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_MAX_ITERATIONS: usize = 30;
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Sorry, I didn't quite get that. Could you say it again?";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Handler invocations allowed per user utterance
    pub max_iterations: usize,
    /// Said to the user when a handler's output fails validation
    pub fallback_message: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// One assistant utterance and the handler that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Utterance {
    pub handler: HandlerName,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Routing settled on a handler that waits for the user
    AwaitingInput,
    /// Routing reached terminal; the session accepts no more input
    Complete,
}

/// Everything produced for one user utterance
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub utterances: Vec<Utterance>,
    pub status: TurnStatus,
    /// State after the turn, for callers that persist it
    pub state: SessionState,
    /// Handler invocations made during the turn
    pub steps: usize,
    /// Set when a handler's output was refused and the fallback was said
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

pub struct WorkflowEngine {
    registry: HandlerRegistry,
    router: Arc<dyn Router>,
    ledger: Ledger,
    config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new(registry: HandlerRegistry, ledger: Ledger) -> Self {
        Self {
            registry,
            router: Arc::new(OrderRouter),
            ledger,
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_router(mut self, router: impl Router + 'static) -> Self {
        self.router = Arc::new(router);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Session for a state persisted by the caller. The cart is repriced
    /// against this engine's catalog, so a stale or edited `order_total`
    /// never reaches the handlers.
    pub fn restore_session(&self, id: impl Into<String>, mut state: SessionState) -> Session {
        let id = id.into();
        if self.ledger.reconcile(&mut state) {
            tracing::warn!(session_id = %id, "Restored state was repriced");
        }
        Session::with_state(id, state)
    }

    /// Route a state without running anything
    pub fn route(&self, state: &SessionState) -> Route {
        self.router.route(state)
    }

    /// Handle one user utterance
    pub async fn step(&self, session: &mut Session, input: &str) -> Result<Turn, EngineError> {
        self.step_with(session, input, |_| {}).await
    }

    /// Like [`step`](Self::step), calling `on_utterance` as each assistant
    /// utterance is produced.
    pub async fn step_with<F>(
        &self,
        session: &mut Session,
        input: &str,
        on_utterance: F,
    ) -> Result<Turn, EngineError>
    where
        F: FnMut(&Utterance) + Send,
    {
        Self::ensure_active(session)?;
        let mark = session.transcript.len();
        session.record_user(input);

        let result = self.drive(session, Some(input), on_utterance).await;
        if let Err(EngineError::HandlerFailed {
            input_consumed: false,
            ..
        }) = &result
        {
            // The input never reached a handler; forget it so it can be resent
            session.transcript.truncate(mark);
        }
        result
    }

    /// Continue routing without new user input.
    ///
    /// Used after a [`EngineError::HandlerFailed`] whose input was already
    /// consumed: the failed hand-off runs again instead of the user's line
    /// being delivered twice.
    pub async fn resume(&self, session: &mut Session) -> Result<Turn, EngineError> {
        self.resume_with(session, |_| {}).await
    }

    pub async fn resume_with<F>(&self, session: &mut Session, on_utterance: F) -> Result<Turn, EngineError>
    where
        F: FnMut(&Utterance) + Send,
    {
        Self::ensure_active(session)?;
        self.drive(session, None, on_utterance).await
    }

    fn ensure_active(session: &Session) -> Result<(), EngineError> {
        if session.is_active() {
            Ok(())
        } else {
            Err(EngineError::SessionClosed {
                id: session.id().to_string(),
                phase: session.phase(),
            })
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn drive<F>(
        &self,
        session: &mut Session,
        input: Option<&str>,
        mut on_utterance: F,
    ) -> Result<Turn, EngineError>
    where
        F: FnMut(&Utterance) + Send,
    {
        let mut pending = input;
        let mut utterances = Vec::new();
        let mut steps = 0;
        let mut route = self.router.route(&session.state);

        loop {
            let name = match route {
                Route::Terminal => {
                    session.phase = SessionPhase::Complete;
                    tracing::info!(
                        session_id = %session.id(),
                        steps,
                        state = %session.state.to_json(),
                        "Workflow complete"
                    );
                    return Ok(Self::turn(session, utterances, TurnStatus::Complete, steps, None));
                }
                Route::Handler(name) => name,
            };

            if steps >= self.config.max_iterations {
                let state_dump = session.state.to_json();
                tracing::error!(
                    session_id = %session.id(),
                    limit = self.config.max_iterations,
                    handler = %name,
                    state = %state_dump,
                    "Iteration limit reached, aborting session"
                );
                session.phase = SessionPhase::Aborted;
                return Err(EngineError::IterationLimit {
                    limit: self.config.max_iterations,
                    last_handler: name,
                    state_dump,
                });
            }
            steps += 1;

            let Some(handler) = self.registry.get(&name) else {
                tracing::error!(
                    session_id = %session.id(),
                    handler = %name,
                    registered = ?self.registry.names(),
                    "Routed to unregistered handler, aborting session"
                );
                session.phase = SessionPhase::Aborted;
                return Err(EngineError::UnknownHandler(name));
            };

            tracing::info!(
                session_id = %session.id(),
                step = steps,
                handler = %name,
                handoff = pending.is_none(),
                "Running handler"
            );

            let result = {
                let ctx = HandlerContext::new(&session.state, pending.take(), &session.transcript);
                handler.run(&ctx).await
            };

            let output = match result {
                Ok(output) => output,
                Err(HandlerError::Validation(reason)) => {
                    return Ok(self.fall_back(session, &name, reason, utterances, steps, &mut on_utterance));
                }
                Err(HandlerError::Capability(source)) => {
                    let input_consumed = input.is_none() || steps > 1;
                    tracing::error!(
                        session_id = %session.id(),
                        handler = %name,
                        step = steps,
                        input_consumed,
                        error = %source,
                        "Handler could not reach the model"
                    );
                    let partial = Self::turn(session, utterances, TurnStatus::AwaitingInput, steps, None);
                    return Err(EngineError::HandlerFailed {
                        handler: name,
                        source,
                        partial: Box::new(partial),
                        input_consumed,
                    });
                }
            };

            match session.state.commit_with_report(&output.delta, &self.ledger) {
                Ok((next, report)) => {
                    if let Some(report) = report {
                        tracing::info!(
                            session_id = %session.id(),
                            handler = %name,
                            added = ?report.added,
                            removed = ?report.removed,
                            unknown = ?report.unknown,
                            missing = ?report.missing,
                            total = %next.order_total(),
                            "Cart updated"
                        );
                    }
                    session.state = next;
                }
                Err(e) => {
                    return Ok(self.fall_back(
                        session,
                        &name,
                        e.to_string(),
                        utterances,
                        steps,
                        &mut on_utterance,
                    ));
                }
            }

            if !output.response.trim().is_empty() {
                session.record_assistant(&name, &output.response);
                let utterance = Utterance {
                    handler: name.clone(),
                    text: output.response,
                };
                on_utterance(&utterance);
                utterances.push(utterance);
            }

            let next = self.router.route(&session.state);
            if next.handler_name() == Some(&name) {
                tracing::debug!(session_id = %session.id(), handler = %name, "Awaiting user input");
                return Ok(Self::turn(session, utterances, TurnStatus::AwaitingInput, steps, None));
            }
            route = next;
        }
    }

    /// End the turn after a refused handler output: nothing is committed
    /// and the user hears the fallback message.
    fn fall_back<F>(
        &self,
        session: &mut Session,
        handler: &HandlerName,
        reason: String,
        mut utterances: Vec<Utterance>,
        steps: usize,
        on_utterance: &mut F,
    ) -> Turn
    where
        F: FnMut(&Utterance),
    {
        tracing::warn!(
            session_id = %session.id(),
            handler = %handler,
            reason = %reason,
            "Handler output rejected, nothing committed"
        );

        let text = self.config.fallback_message.clone();
        session.record_assistant(handler, &text);
        let utterance = Utterance {
            handler: handler.clone(),
            text,
        };
        on_utterance(&utterance);
        utterances.push(utterance);

        Self::turn(session, utterances, TurnStatus::AwaitingInput, steps, Some(reason))
    }

    fn turn(
        session: &Session,
        utterances: Vec<Utterance>,
        status: TurnStatus,
        steps: usize,
        validation_error: Option<String>,
    ) -> Turn {
        Turn {
            utterances,
            status,
            state: session.state.clone(),
            steps,
            validation_error,
        }
    }
}
