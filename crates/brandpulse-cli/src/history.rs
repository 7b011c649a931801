//! `history` command handlers.

use clap::Subcommand;

use brandpulse_core::AppConfig;
use brandpulse_insights::{JsonFileHistoryStore, SuggestionHistoryStore};

/// Sub-commands available under `history`.
#[derive(Debug, Subcommand)]
pub enum HistoryCommands {
    /// List recently suggested topics, newest first
    Show,
    /// Forget every recently suggested topic
    Clear,
}

pub(crate) fn run_history(config: &AppConfig, command: &HistoryCommands) -> anyhow::Result<()> {
    let store = JsonFileHistoryStore::new(config.history_path.clone());
    match command {
        HistoryCommands::Show => {
            let topics = store.recent_topics()?;
            if topics.is_empty() {
                println!("no recent topics in {}", store.path().display());
            } else {
                for topic in topics {
                    println!("{topic}");
                }
            }
        }
        HistoryCommands::Clear => {
            store.clear()?;
            println!("cleared suggestion history at {}", store.path().display());
        }
    }
    Ok(())
}
