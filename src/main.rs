use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use parley::{Config, ConversationState, app, logging};

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Chat with an OpenAI-compatible model from your terminal", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to ~/.parley/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model to request
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Chat-completion endpoint URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Send the whole conversation with each request, not just the latest message
    #[arg(long, global = true)]
    history: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message and print the reply
    Ask { prompt: String },
    /// Write a default config file if none exists
    Init,
    /// Show the effective configuration
    Config,
}

impl Cli {
    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::default_path(),
        }
    }

    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_from(&self.config_path()?)?;
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if self.history {
            config.send_history = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    match &cli.command {
        None => {
            logging::init(&config, cli.verbose)?;
            app::run(config).await
        }
        Some(Commands::Ask { prompt }) => {
            logging::init(&config, cli.verbose)?;
            ask(&config, prompt).await
        }
        Some(Commands::Init) => init(&cli),
        Some(Commands::Config) => {
            println!("{}", config.describe());
            Ok(())
        }
    }
}

async fn ask(config: &Config, prompt: &str) -> Result<()> {
    let mut dispatcher = app::dispatcher_from_config(config)?;
    let mut state = ConversationState::new();
    state.set_draft_input(prompt);

    if !dispatcher.send(&mut state).await {
        anyhow::bail!("Nothing to send: the prompt is empty");
    }

    let reply = state
        .messages()
        .last()
        .context("No reply was recorded")?;
    println!("{}", reply.text());
    Ok(())
}

fn init(cli: &Cli) -> Result<()> {
    let path = cli.config_path()?;
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    Config::default().save(&path)?;
    println!("Wrote default config to {}", path.display());
    println!("Set {} or add api_key to the file to start chatting.", parley::config::API_KEY_ENV);
    Ok(())
}
