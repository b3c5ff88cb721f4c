use anyhow::Result;
use clap::Args;
use codex_core::{Deck, DeckProvider};
use console::style;

#[derive(Debug, Args)]
pub struct DrawCommand {
    /// Number of cards to draw
    #[arg(default_value_t = 1)]
    count: usize,

    /// Print the drawn cards as JSON
    #[arg(long)]
    json: bool,
}

impl DrawCommand {
    pub fn execute(self, deck: &Deck) -> Result<()> {
        let cards = deck.draw(self.count)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&cards)?);
            return Ok(());
        }

        for (i, card) in cards.iter().enumerate() {
            let number = card.arcana_number.as_deref().unwrap_or("-");
            println!(
                "{}. {} {}",
                i + 1,
                style(&card.name).cyan().bold(),
                style(format!("({number})")).dim()
            );
            if !card.keywords.is_empty() {
                println!("   {}", style(card.keywords.join(", ")).dim());
            }
        }
        Ok(())
    }
}
