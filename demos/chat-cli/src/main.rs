//! chat-cli — interactive terminal client for a single conduit agent.
//!
//! Reads one line at a time from stdin, runs it through the agent loop, and
//! prints streamed tokens and tool activity to stdout as they arrive.

use std::io::{self, BufRead, Write as _};
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use conduit_core::Message;
use conduit_llm::OpenAiCompatibleProvider;
use conduit_runtime::{Agent, AgentRegistry, ContextCarrier, Event, ModelConfig, RunInput, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "chat-cli", version, about)]
struct Cli {
    /// Model name passed to the provider.
    #[arg(long, env = "CONDUIT_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Override the provider's default base URL, for OpenAI-compatible
    /// gateways (local inference servers, proxies, etc).
    #[arg(long, env = "CONDUIT_BASE_URL")]
    base_url: Option<String>,

    /// System prompt for the single agent this client drives.
    #[arg(long, default_value = "You are a concise, helpful assistant.")]
    instructions: String,

    /// API key. Falls back to OPENAI_API_KEY from the environment or a
    /// local .env file.
    #[arg(long, env = "OPENAI_API_KEY")]
    api_key: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut provider = OpenAiCompatibleProvider::new(cli.api_key);
    if let Some(base_url) = cli.base_url.clone() {
        provider = provider.with_base_url(base_url);
    }
    let provider: Arc<dyn conduit_runtime::ChatProvider> = Arc::new(provider);

    let mut registry = AgentRegistry::new();
    registry.register(Agent::new(
        "assistant",
        cli.instructions.as_str(),
        ModelConfig::new(cli.model.clone()),
    ))?;
    let registry = Arc::new(registry);

    info!(model = %cli.model, "chat-cli ready, type a message and press enter");

    let stdin = io::stdin();
    let mut conversation: Vec<Message> = Vec::new();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if matches!(line.trim(), "quit" | "exit") {
            break;
        }

        conversation.push(Message::user(line));

        let response = conduit_runtime::run(
            registry.clone(),
            "assistant",
            RunInput::Conversation(conversation.clone()),
            ContextCarrier::empty(),
            provider.clone(),
            RunOptions::default(),
        )
        .await;

        let mut rx = response.stream();
        while let Some(event) = rx.recv().await {
            match event {
                Event::Token { text, .. } => {
                    print!("{text}");
                    io::stdout().flush().ok();
                }
                Event::ToolResult { call, output, is_error, .. } => {
                    if is_error {
                        warn!(tool = %call.name, %output, "tool call failed");
                    } else {
                        info!(tool = %call.name, %output, "tool call finished");
                    }
                }
                Event::Handoff { from_agent, to_agent, .. } => {
                    info!(%from_agent, %to_agent, "handed off");
                }
                Event::Error { message, .. } => {
                    warn!(%message, "run ended with an error");
                }
                Event::Message { .. } | Event::Finished { .. } => {}
            }
        }
        println!();

        conversation = response.final_conversation();
    }

    Ok(())
}
