//! CLI commands for triad using clap.

use std::io::{BufRead, Write};

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{load_settings_or_default, switch_provider, Settings};
use crate::network::{Network, PumpMode};
use crate::providers::{create_provider, get_current_provider, AVAILABLE_PROVIDERS};

/// triad - Planner, Worker and Verifier agents over an in-process message bus.
#[derive(Parser)]
#[command(name = "triad")]
#[command(version)]
#[command(about = "Planner -> Worker -> Verifier agent network", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one request through the agent network
    Run {
        /// The request text
        #[arg(required = true)]
        request: Vec<String>,

        /// Run Worker and Verifier on their own tasks
        #[arg(long)]
        concurrent: bool,
    },

    /// Interactive session; type exit or quit to leave
    Chat {
        /// Run Worker and Verifier on their own tasks
        #[arg(long)]
        concurrent: bool,
    },

    /// Run one request through the sequential pipeline (no bus)
    Pipeline {
        /// The request text
        #[arg(required = true)]
        request: Vec<String>,
    },

    /// Show or switch provider
    Provider {
        /// Provider name: ollama, gemini, claude
        name: Option<String>,

        /// Model to use
        #[arg(long = "model")]
        model: Option<String>,
    },

    /// Print the effective settings
    Config,
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Command::Run { request, concurrent } => cmd_run(&request.join(" "), *concurrent).await,
            Command::Chat { concurrent } => cmd_chat(*concurrent).await,
            Command::Pipeline { request } => cmd_pipeline(&request.join(" ")).await,
            Command::Provider { name, model } => cmd_provider(name, model).await,
            Command::Config => cmd_config().await,
        }
    }
}

fn build_network(settings: &Settings, concurrent: bool) -> Result<Network> {
    let provider = get_current_provider(settings);
    tracing::debug!(
        provider = provider.name(),
        model = ?provider.default_model(),
        "Using provider"
    );
    let mut network = Network::new(provider, settings)?;
    if concurrent {
        network.set_mode(PumpMode::Concurrent);
    }
    Ok(network)
}

fn print_answer(answer: &str) {
    let shown = if answer.trim().is_empty() {
        "<no result>"
    } else {
        answer
    };
    println!("\nFinal Answer:\n{}\n", shown);
}

async fn cmd_run(request: &str, concurrent: bool) -> Result<()> {
    let settings = load_settings_or_default();
    let mut network = build_network(&settings, concurrent)?;
    let answer = network.run(request).await?;
    print_answer(&answer);
    Ok(())
}

async fn cmd_chat(concurrent: bool) -> Result<()> {
    let settings = load_settings_or_default();
    let mut network = build_network(&settings, concurrent)?;
    let stdin = std::io::stdin();

    loop {
        print!("User (A2A)> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let answer = network.run(input).await?;
        print_answer(&answer);
    }

    Ok(())
}

async fn cmd_pipeline(request: &str) -> Result<()> {
    let settings = load_settings_or_default();
    let network = build_network(&settings, false)?;
    println!("[Running pipeline...]");
    let answer = network.run_pipeline(request).await;
    println!("\n=== Final Answer ===\n{}\n", answer);
    Ok(())
}

async fn cmd_provider(name: &Option<String>, model: &Option<String>) -> Result<()> {
    let settings = load_settings_or_default();

    if let Some(n) = name {
        if !AVAILABLE_PROVIDERS.iter().any(|(id, _)| id == n) {
            println!("Unknown provider: {}", n);
            println!("Available providers:");
            for (id, desc) in AVAILABLE_PROVIDERS {
                println!("  {} - {}", id, desc);
            }
            return Ok(());
        }

        let path = switch_provider(n, model.as_deref())?;
        tracing::debug!("Saved settings to {}", path.display());

        match model {
            Some(m) => println!("Switched to provider: {} (model: {})", n, m),
            None => println!("Switched to provider: {}", n),
        }
        return Ok(());
    }

    let provider = create_provider(&settings.models.provider, &settings);
    let available = provider.is_available().await;
    println!("Current provider: {}", provider.name());
    println!("Model: {}", provider.default_model().unwrap_or("default"));
    println!("Available: {}", if available { "yes" } else { "no" });
    println!("\nAvailable providers:");
    for (id, desc) in AVAILABLE_PROVIDERS {
        let marker = if *id == settings.models.provider { "*" } else { " " };
        println!(" {} {} - {}", marker, id, desc);
    }
    Ok(())
}

async fn cmd_config() -> Result<()> {
    let mut shown = load_settings_or_default();
    if shown.models.api_key.is_some() {
        shown.models.api_key = Some("***".to_string());
    }
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_words() {
        let cli = Commands::try_parse_from(["triad", "run", "plan", "a", "trip", "--concurrent"]).unwrap();
        match cli.command {
            Command::Run { request, concurrent } => {
                assert_eq!(request.join(" "), "plan a trip");
                assert!(concurrent);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_requires_a_request() {
        assert!(Commands::try_parse_from(["triad", "run"]).is_err());
    }

    #[test]
    fn parses_provider_switch() {
        let cli = Commands::try_parse_from(["triad", "provider", "gemini", "--model", "gemini-2.5-pro"]).unwrap();
        match cli.command {
            Command::Provider { name, model } => {
                assert_eq!(name.as_deref(), Some("gemini"));
                assert_eq!(model.as_deref(), Some("gemini-2.5-pro"));
            }
            _ => panic!("expected provider"),
        }
    }
}
