use anyhow::Result;
use clap::Args;
use codex_core::{SpreadType, UsageGate};
use console::style;

#[derive(Debug, Args)]
pub struct SpreadsCommand {}

impl SpreadsCommand {
    pub fn execute(self, gate: &dyn UsageGate) -> Result<()> {
        for spread in SpreadType::ALL {
            let availability = match (gate.can_use_spread(spread), gate.remaining(spread)) {
                (false, _) => style("not available".to_string()).red(),
                (true, Some(left)) => style(format!("limited to {left} per session")).yellow(),
                (true, None) => style("unlimited".to_string()).green(),
            };

            println!(
                "{} ({} card{}) {}",
                style(spread).cyan().bold(),
                spread.card_count(),
                if spread.card_count() == 1 { "" } else { "s" },
                availability
            );
            for (i, position) in spread.positions().iter().enumerate() {
                println!("  {}. {}", i + 1, position);
            }
        }
        Ok(())
    }
}
