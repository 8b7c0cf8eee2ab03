#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use websage::{agent, providers, Config};

fn parse_temperature(s: &str) -> std::result::Result<f64, String> {
    let t: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=2.0).contains(&t) {
        return Err("temperature must be between 0.0 and 2.0".to_string());
    }
    Ok(t)
}

/// websage - a chat agent that knows when to search the web.
#[derive(Parser, Debug)]
#[command(name = "websage")]
#[command(version)]
#[command(about = "Chat agent that decides per query whether to search the web.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the chat agent
    #[command(long_about = "\
Start the chat agent.

Launches an interactive chat session. Each query is classified: queries \
needing current information trigger a web search whose results ground the \
answer; everything else is answered from model knowledge. Use --message \
for single-shot queries without entering interactive mode.

Examples:
  websage agent                              # interactive session
  websage agent -m \"What is the weather in Oslo?\"
  websage agent -p openrouter --model openai/gpt-4o-mini")]
    Agent {
        /// Single message mode (don't enter interactive mode)
        #[arg(short, long)]
        message: Option<String>,

        /// Provider to use (openai, openrouter, groq, custom:<URL>)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use
        #[arg(long)]
        model: Option<String>,

        /// Temperature (0.0 - 2.0) for answer synthesis
        #[arg(short, long, default_value = "0.7", value_parser = parse_temperature)]
        temperature: f64,
    },

    /// Show system status
    Status,

    /// List supported model providers
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("WEBSAGE_CONFIG_DIR", config_dir);
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::load_or_init().await?;

    match cli.command {
        Commands::Agent {
            message,
            provider,
            model,
            temperature,
        } => agent::run(config, message, provider, model, temperature).await,

        Commands::Status => {
            println!("websage status");
            println!();
            println!("Version:     {}", env!("CARGO_PKG_VERSION"));
            println!("Config:      {}", config.config_path.display());
            println!();
            println!(
                "Provider:    {}",
                config.default_provider.as_deref().unwrap_or("openai")
            );
            println!(
                "Model:       {}",
                config.default_model.as_deref().unwrap_or("(default)")
            );
            println!("Temperature: {}", config.default_temperature);
            println!();
            println!("Search:      {}", config.search.provider);
            println!("  Max results:  {}", config.search.max_results);
            println!("  Timeout:      {}ms", config.search.timeout_ms);
            println!(
                "  API key:      {}",
                if config.search.api_key.is_some() {
                    "set"
                } else {
                    "missing (set TAVILY_API_KEY)"
                }
            );
            Ok(())
        }

        Commands::Providers => {
            let providers = providers::list_providers();
            let current = config
                .default_provider
                .as_deref()
                .unwrap_or("openai")
                .trim()
                .to_ascii_lowercase();
            println!("Supported providers ({} total):\n", providers.len());
            for p in &providers {
                let marker = if p.name.eq_ignore_ascii_case(&current) {
                    " (active)"
                } else {
                    ""
                };
                println!("  {:<12} {}{}", p.name, p.display_name, marker);
            }
            println!("\n  custom:<URL>   Any OpenAI-compatible endpoint");
            Ok(())
        }
    }
}
