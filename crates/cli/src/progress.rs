//! Terminal view of a reading in progress
//!
//! Follows store snapshots: the spinner names the running stage, and each
//! stage result is printed above it the moment it lands.

use codex_core::{ReadingStatus, SpreadType};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use orchestrator::ReadingState;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";
const TICK_INTERVAL: Duration = Duration::from_millis(120);

#[derive(Debug, Default)]
struct Printed {
    analysis: bool,
    synthesis: bool,
    oracle: bool,
}

pub struct ReadingView {
    spinner: ProgressBar,
    /// Print stage text to stdout; off when stdout carries JSON
    echo: bool,
    printed: Printed,
    generation: Option<u64>,
    retries_seen: u32,
}

impl ReadingView {
    pub fn new(echo: bool) -> Self {
        let spinner = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::with_template("{spinner:.magenta} {msg}")
            .map(|s| s.tick_chars(TICK_CHARS))
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(spinner_style);
        spinner.set_message("Shuffling the deck...");
        spinner.enable_steady_tick(TICK_INTERVAL);

        Self {
            spinner,
            echo,
            printed: Printed::default(),
            generation: None,
            retries_seen: 0,
        }
    }

    pub fn update(&mut self, state: &ReadingState) {
        if self.generation != Some(state.generation) {
            self.generation = Some(state.generation);
            self.printed = Printed::default();
        }

        if state.retry_count > self.retries_seen {
            self.retries_seen = state.retry_count;
            self.spinner.suspend(|| {
                eprintln!(
                    "{}",
                    style(format!(
                        "The connection faltered, starting over (attempt {})",
                        state.retry_count + 1
                    ))
                    .yellow()
                )
            });
            // A retry starts from analyze, results already printed are gone
            self.printed = Printed::default();
        }

        self.spinner.set_message(stage_message(state));

        if !self.printed.analysis {
            if let (Some(opening), Some(cards)) = (&state.opening, &state.card_analyses) {
                self.printed.analysis = true;
                self.print(|| {
                    println!("\n{}\n", style(opening).italic());
                    for card in cards {
                        println!(
                            "{} {}",
                            style(&card.position).magenta().bold(),
                            style(format!("· {}", card.card)).cyan()
                        );
                        println!("{}\n", card.analysis);
                    }
                });
            }
        }

        if !self.printed.synthesis {
            if let Some(synthesis) = &state.synthesis {
                self.printed.synthesis = true;
                self.print(|| {
                    println!("{}", style("The Threads Converge").magenta().bold());
                    println!("{synthesis}\n");
                });
            }
        }

        if !self.printed.oracle {
            if let Some(oracle) = &state.oracle {
                self.printed.oracle = true;
                self.print(|| {
                    println!("{}", style("The Oracle Speaks").magenta().bold());
                    println!("{}\n", style(oracle).italic());
                });
            }
        }
    }

    pub fn finish_success(&self, spread: SpreadType) {
        self.spinner.finish_and_clear();
        eprintln!(
            "{}",
            style(format!("✓ {spread} reading complete")).green()
        );
    }

    pub fn finish_error(&self, message: &str) {
        self.spinner.finish_and_clear();
        eprintln!("{}", style(format!("✗ {message}")).red());
    }

    fn print(&self, f: impl FnOnce()) {
        if self.echo {
            self.spinner.suspend(f);
        }
    }
}

fn stage_message(state: &ReadingState) -> String {
    match state.status {
        ReadingStatus::Idle | ReadingStatus::Drawing => "Shuffling the deck...".to_string(),
        ReadingStatus::Analyzing => {
            format!("Reading {} cards...", state.selected_cards.len())
        }
        ReadingStatus::Synthesizing => "Weaving the threads together...".to_string(),
        ReadingStatus::Oracle => "Consulting the oracle...".to_string(),
        ReadingStatus::Complete => "Done".to_string(),
        ReadingStatus::Error => "Reading failed".to_string(),
    }
}
