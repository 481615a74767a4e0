//! Palaver application binary - composition root.
//!
//! Ties the client crates together into one executable:
//! 1. Load configuration from TOML
//! 2. Wire the backend and voice capabilities into the orchestrator
//! 3. Bootstrap state from the backend
//! 4. Submit a message and print the resulting transcript
//!
//! The bundled demo backend echoes messages back as a word-by-word stream,
//! exercising the full submit / stream / settle cycle end to end.

use std::sync::Arc;

use clap::Parser;
use palaver_chat::{InteractionOrchestrator, MarkdownRenderer, SubmitOutcome};
use palaver_core::{ClientConfig, Role};

mod cli;
mod demo;

use cli::CliArgs;
use demo::{DemoBackend, DemoRecognizer, DemoSynthesizer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = ClientConfig::load_or_default(&config_file);

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Palaver v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), backend = %config.general.backend_url, "Configuration loaded");

    // Orchestrator over the demo backend and capabilities.
    let orchestrator = Arc::new(InteractionOrchestrator::new(
        Arc::new(DemoBackend::new()),
        Arc::new(DemoRecognizer),
        Arc::new(DemoSynthesizer),
        Arc::new(MarkdownRenderer),
        &config,
    ));

    orchestrator.bootstrap().await?;

    tracing::info!(model = %orchestrator.selected_model(), message = %args.message, "Submitting message");
    let outcome = orchestrator.submit(&args.message).await?;
    match outcome {
        SubmitOutcome::Completed { ending, .. } => {
            tracing::info!(ending = ?ending, "Reply stream finished");
        }
        SubmitOutcome::Rejected(reason) => {
            tracing::error!(reason = %reason, "Message rejected");
        }
        SubmitOutcome::Ignored(reason) => {
            tracing::warn!(reason = ?reason, "Message ignored");
        }
    }

    // Print the canonical transcript.
    println!("# {}", orchestrator.conversation_title());
    for entry in orchestrator.transcript().entries() {
        let who = match entry.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        println!("[{}] {}", who, entry.source);
    }
    for notice in orchestrator.drain_notices() {
        println!("! {}", notice);
    }

    Ok(())
}
