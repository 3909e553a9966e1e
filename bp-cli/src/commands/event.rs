//! Event Commands
//!
//! Preview/commit protocol and spent pool operations for one event.

use clap::Subcommand;

/// Event subcommands
#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// Print the canonical hash of an allocation file
    Hash {
        /// Allocation JSON file
        #[arg(short, long)]
        allocation: String,
    },

    /// Hash and store a proposed allocation
    Preview {
        #[arg(short, long)]
        event: String,

        /// Allocation JSON file
        #[arg(short, long)]
        allocation: String,

        /// RNG seed used to produce the allocation
        #[arg(short, long)]
        seed: Option<String>,
    },

    /// Commit spend lines if the hash matches the live preview
    Commit {
        #[arg(short, long)]
        event: String,

        /// Event type recorded on each spend line
        #[arg(short = 't', long, default_value = "event")]
        event_type: String,

        /// Hex hash returned by preview
        #[arg(long)]
        hash: String,

        /// JSON array of spend line items
        #[arg(short, long)]
        lines: String,
    },

    /// Revert every entry of a batch (idempotent)
    Revert {
        #[arg(short, long)]
        batch: String,
    },

    /// Active spend for an event
    Spent {
        #[arg(short, long)]
        event: String,

        /// List entries, reverted included
        #[arg(long)]
        entries: bool,
    },

    /// Protocol state for an event
    State {
        #[arg(short, long)]
        event: String,
    },
}
