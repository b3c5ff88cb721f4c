use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codex_core::{AllowanceGate, Deck, SpreadLimits, UsageSnapshot};
use common::{init_structured_logging, CodexConfig};
use tracing::{debug, Level};

mod commands;
mod progress;

use commands::{DrawCommand, ReadCommand, SpreadsCommand};

#[derive(Parser)]
#[command(name = "codex")]
#[command(about = "Codex Tarot readings in the terminal")]
#[command(version)]
struct Cli {
    /// Log at the configured level instead of warnings only
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the spreads, their positions and configured limits
    Spreads(SpreadsCommand),
    /// Draw cards without generating a reading
    Draw(DrawCommand),
    /// Draw cards and generate a full reading
    Read(ReadCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CodexConfig::from_env().context("Invalid configuration")?;

    let mut logging = config.logging.clone();
    if !cli.verbose {
        logging.level = Level::WARN;
    }
    init_structured_logging(logging)?;
    debug!(backend = %config.backend.kind, "Configuration loaded");

    match cli.command {
        Commands::Spreads(cmd) => cmd.execute(&usage_gate(&config)),
        Commands::Draw(cmd) => cmd.execute(&load_deck(&config)?),
        Commands::Read(cmd) => {
            let deck = load_deck(&config)?;
            let mut gate = usage_gate(&config);
            cmd.execute(&config, &deck, &mut gate).await
        }
    }
}

fn load_deck(config: &CodexConfig) -> Result<Deck> {
    match &config.deck_path {
        Some(path) => Deck::load(path)
            .with_context(|| format!("Failed to load card catalog from {}", path.display())),
        None => Deck::major_arcana().context("Bundled card catalog is invalid"),
    }
}

/// Allowance from configured limits; no limits means nothing is gated
fn usage_gate(config: &CodexConfig) -> AllowanceGate {
    let limits = config.limits;
    if limits.three_card.is_none() && limits.five_card.is_none() {
        return AllowanceGate::default();
    }

    AllowanceGate::new(Some(UsageSnapshot::fresh(SpreadLimits {
        one_card: None,
        three_card: limits.three_card,
        five_card: limits.five_card,
    })))
}
