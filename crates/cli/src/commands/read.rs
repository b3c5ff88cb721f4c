use anyhow::{bail, Context, Result};
use clap::Args;
use codex_core::{CompletedReading, Deck, SpreadType, UsageGate};
use common::{BackendKind, CodexConfig};
use console::style;
use llm::build_generation_client;
use orchestrator::{ReadingOrchestrator, RetryPolicy};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::progress::ReadingView;

#[derive(Debug, Args)]
pub struct ReadCommand {
    /// The question or intention for the reading
    intention: String,

    /// Spread to lay out: single, three or five
    #[arg(short, long, default_value_t = SpreadType::Three)]
    spread: SpreadType,

    /// Use canned responses instead of a backend
    #[arg(long)]
    mock: bool,

    /// Print the finished reading as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Also write the finished reading as JSON to this file
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,
}

impl ReadCommand {
    pub async fn execute(
        self,
        config: &CodexConfig,
        deck: &Deck,
        gate: &mut dyn UsageGate,
    ) -> Result<()> {
        if !gate.can_use_spread(self.spread) {
            bail!(
                "The {} spread is not available under the configured limits",
                self.spread
            );
        }

        let mut backend = config.backend.clone();
        if self.mock {
            backend.kind = BackendKind::Mock;
        }
        let client = build_generation_client(&backend)?;
        let orchestrator =
            ReadingOrchestrator::with_policy(client, RetryPolicy::from(&config.retry));

        info!(
            spread = %self.spread,
            backend = %backend.kind,
            max_retries = config.retry.max_retries,
            "Starting reading"
        );

        let mut view = ReadingView::new(!self.json);
        let mut rx = orchestrator.subscribe();
        let reading = orchestrator.draw_and_generate(deck, &self.intention, self.spread);
        tokio::pin!(reading);

        let result = loop {
            tokio::select! {
                result = &mut reading => break result,
                Ok(()) = rx.changed() => {
                    let state = rx.borrow_and_update().clone();
                    view.update(&state);
                }
            }
        };
        // Snapshots can coalesce; the final one still holds every result
        view.update(&orchestrator.snapshot());

        let reading = match result {
            Ok(reading) => reading,
            Err(e) => {
                view.finish_error(&e.to_string());
                return Err(e.into());
            }
        };
        view.finish_success(self.spread);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reading)?);
        }
        if let Some(path) = &self.save {
            save_reading(&reading, path).await?;
            eprintln!("Saved to {}", path.display());
        }

        // Fresh snapshot per run: counts this process only
        gate.record_reading(self.spread);
        if let Some(left) = gate.remaining(self.spread) {
            eprintln!(
                "{}",
                style(format!("{left} {} reading(s) left in this session", self.spread)).dim()
            );
        }

        Ok(())
    }
}

async fn save_reading(reading: &CompletedReading, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(reading)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write reading to {}", path.display()))
}
