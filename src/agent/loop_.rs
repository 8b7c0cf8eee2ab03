//! CLI-facing agent entry points: wire config into an [`Agent`] and drive the
//! interactive chat loop or a single-shot message.

use crate::agent::orchestrator::Agent;
use crate::agent::trace::AgentOutcome;
use crate::config::Config;
use crate::error::AgentError;
use crate::{providers, search};
use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

/// Build an [`Agent`] from loaded config plus CLI overrides.
pub fn build_agent(
    config: &Config,
    provider_override: Option<&str>,
    model_override: Option<&str>,
    temperature: f64,
) -> Result<Agent> {
    let provider_name = provider_override
        .or(config.default_provider.as_deref())
        .unwrap_or("openai");
    let model = model_override
        .or(config.default_model.as_deref())
        .unwrap_or("gpt-4o-mini");

    let provider = providers::create_provider_with_url(
        provider_name,
        config.api_key.as_deref(),
        config.api_url.as_deref(),
    )?;

    let search_provider = search::create_search_provider(
        &config.search.provider,
        config.search.api_key.as_deref(),
        config.search.timeout_ms,
    )?;

    Ok(Agent::builder(Arc::from(provider), Arc::from(search_provider))
        .model(model)
        .temperature(temperature)
        .max_results(config.search.max_results)
        .classification_retries(config.agent.classification_retries)
        .build())
}

/// Process a single message, returning the outcome or a typed failure.
pub async fn process_message(agent: &Agent, message: &str) -> Result<AgentOutcome, AgentError> {
    agent.run(message).await
}

/// CLI entry point: single-shot with `-m`, interactive loop otherwise.
pub async fn run(
    config: Config,
    message: Option<String>,
    provider: Option<String>,
    model: Option<String>,
    temperature: f64,
) -> Result<()> {
    let agent = build_agent(
        &config,
        provider.as_deref(),
        model.as_deref(),
        temperature,
    )?;

    if let Some(message) = message {
        match process_message(&agent, &message).await {
            Ok(outcome) => {
                debug!(used_search = outcome.used_search, "Single-shot message answered");
                println!("{}", outcome.answer);
            }
            Err(e) => anyhow::bail!("{e}"),
        }
        return Ok(());
    }

    println!("websage - ask me anything; I'll search the web when the question needs it.");
    println!("Type 'quit' or 'exit' to leave.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }

        match process_message(&agent, input).await {
            Ok(outcome) => {
                let marker = if outcome.used_search { " [web]" } else { "" };
                println!("AI{marker}: {}", outcome.answer);
            }
            // Typed failures become an error turn, not a crash.
            Err(e) => println!("AI: Sorry, something went wrong ({e}). Please try again."),
        }
    }

    Ok(())
}
