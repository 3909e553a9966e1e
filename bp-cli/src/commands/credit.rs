//! Credit Commands

use clap::Subcommand;
use rust_decimal::Decimal;

/// Store credit subcommands
#[derive(Subcommand, Debug)]
pub enum CreditCommands {
    /// Add credit
    Add {
        #[arg(short, long)]
        player: String,

        #[arg(short, long)]
        amount: Decimal,

        #[arg(short, long, default_value = "")]
        memo: String,
    },

    /// Spend credit
    Spend {
        #[arg(short, long)]
        player: String,

        #[arg(short, long)]
        amount: Decimal,

        #[arg(short, long, default_value = "")]
        memo: String,
    },

    /// Derived balance
    Balance {
        #[arg(short, long)]
        player: String,
    },

    /// Transaction history
    History {
        #[arg(short, long)]
        player: String,
    },
}
