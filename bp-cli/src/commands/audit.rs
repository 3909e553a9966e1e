//! Audit Commands

use clap::Subcommand;

/// Audit subcommands
#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// Most recent entries, oldest first
    Tail {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Entries for one event
    Event {
        #[arg(short, long)]
        event: String,
    },
}
