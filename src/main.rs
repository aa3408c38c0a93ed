//! Order Flow - interactive food-order assistant
//!
//! Reads customer lines from stdin and prints the assistant's replies.
//! Logs go to stderr as JSON.

use order_flow::config::AppConfig;
use order_flow::handlers::standard_registry;
use order_flow::llm::{ModelClient, ModelRegistry};
use order_flow::{
    EngineError, HandlerName, RuntimeError, RuntimeManager, Turn, TurnStatus, WorkflowEngine,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_flow=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = AppConfig::from_env()?;
    let catalog = Arc::new(config.load_catalog()?);
    let models = ModelRegistry::new(&config.models)?;
    tracing::info!(
        models = ?models.available_models(),
        default = %models.default_model_id(),
        menu = %catalog.name(),
        max_iterations = config.engine.max_iterations,
        unknown_items = %config.unknown_items,
        "Model registry initialized"
    );

    // standard_registry asks for exactly these four handlers
    let mut clients: HashMap<HandlerName, Arc<dyn ModelClient>> = HashMap::new();
    for handler in [
        HandlerName::TYPE_SELECTION,
        HandlerName::ITEM_SELECTION,
        HandlerName::CONFIRMATION,
        HandlerName::IDENTITY_COLLECTION,
    ] {
        let client = models
            .for_handler(&handler)
            .ok_or_else(|| format!("no model client for {handler}"))?;
        tracing::info!(handler = %handler, model = %client.model_id(), "Handler model");
        clients.insert(handler, client);
    }

    let registry = standard_registry(|name| Arc::clone(&clients[name]), catalog.clone());
    let engine =
        WorkflowEngine::new(registry, config.ledger(catalog)).with_config(config.engine.clone());
    let manager = RuntimeManager::new(Arc::new(engine));
    let session_id = manager.create_session().await;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout.write_all(b"Welcome! Say hello to start your order.\n> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }

        let mut outcome = manager.send_message(&session_id, line).await;

        // A hand-off that failed after the line was taken is rerun once
        // without the line; the user hears what was said before the failure
        if let Err(RuntimeError::Engine(e @ EngineError::HandlerFailed { input_consumed: true, .. })) =
            &outcome
        {
            tracing::warn!(error = %e, "Hand-off failed, resuming");
            if let Some(partial) = e.partial_turn() {
                write_utterances(&mut stdout, partial).await?;
            }
            outcome = manager.resume(&session_id).await;
        }

        match outcome {
            Ok(turn) => {
                write_utterances(&mut stdout, &turn).await?;
                if turn.status == TurnStatus::Complete {
                    let summary = format!(
                        "\nOrder for {}: {} (total ${})\n",
                        turn.state.name_for_order().unwrap_or("guest"),
                        turn.state.cart_summary(),
                        turn.state.order_total()
                    );
                    stdout.write_all(summary.as_bytes()).await?;
                    stdout.flush().await?;
                    return Ok(());
                }
            }
            Err(RuntimeError::Engine(e)) if !e.is_fatal() => {
                tracing::warn!(error = %e, "Turn failed");
                stdout
                    .write_all(b"Sorry, something went wrong on our side. Please try again.\n")
                    .await?;
            }
            Err(e) => {
                tracing::error!(error = %e, "Session aborted");
                stdout
                    .write_all(b"Sorry, we can't take your order right now.\n")
                    .await?;
                stdout.flush().await?;
                return Err(e.into());
            }
        }

        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    manager.end_session(&session_id).await.ok();
    Ok(())
}

async fn write_utterances(stdout: &mut tokio::io::Stdout, turn: &Turn) -> std::io::Result<()> {
    for utterance in &turn.utterances {
        stdout
            .write_all(format!("{}\n", utterance.text).as_bytes())
            .await?;
    }
    Ok(())
}
