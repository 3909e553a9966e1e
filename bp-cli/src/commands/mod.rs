//! CLI Commands Module

pub mod audit;
pub mod credit;
pub mod event;

use bp_core::LogLevel;
use clap::{Parser, Subcommand};

/// Bonus points ledger CLI
#[derive(Parser, Debug)]
#[command(name = "bp")]
#[command(version)]
#[command(about = "Bonus points ledger command line interface")]
#[command(long_about = "Award points, run the preview/commit protocol for event \
    spend, manage store credit and read the audit log of a local ledger.")]
pub struct Cli {
    /// Ledger data directory (env: BP_DATA_DIR)
    #[arg(short, long, env = "BP_DATA_DIR", default_value = "./bp_data")]
    pub data_dir: String,

    /// Player roster file, one id per line (env: BP_ROSTER)
    #[arg(short, long, env = "BP_ROSTER")]
    pub roster: Option<String>,

    /// Operator recorded on audit entries (env: BP_OPERATOR)
    #[arg(short, long, env = "BP_OPERATOR", default_value = "cli")]
    pub operator: String,

    /// Log level when RUST_LOG is unset (env: BP_LOG_LEVEL)
    #[arg(long, env = "BP_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Output format (json, table)
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// `--verbose` forces debug; an unknown level falls back to warn
    pub fn log_level(&self) -> LogLevel {
        if self.verbose {
            return LogLevel::Debug;
        }
        LogLevel::parse(&self.log_level).unwrap_or(LogLevel::Warn)
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Table format (human-readable)
    #[default]
    Table,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Award points to a player
    Award {
        /// Player id or unique fragment of one
        #[arg(short, long)]
        player: String,

        /// Points to award (must be positive)
        #[arg(short, long, allow_hyphen_values = true)]
        amount: i64,

        /// Award source (attendance, flag, dice)
        #[arg(short, long)]
        source: String,

        /// Extra audit metadata as key=value, repeatable
        #[arg(short, long = "meta")]
        meta: Vec<String>,
    },

    /// Re-run aggregate and governor with a zero delta
    Resync {
        #[arg(short, long)]
        player: String,
    },

    /// Show balances, prestige and store credit
    Balance {
        #[arg(short, long)]
        player: String,
    },

    /// Record a redemption against a player
    Redeem {
        #[arg(short, long)]
        player: String,

        /// Points redeemed
        #[arg(short, long)]
        amount: u64,
    },

    /// Preview/commit protocol and spent pool
    #[command(subcommand)]
    Event(event::EventCommands),

    /// Store credit ledger
    #[command(subcommand)]
    Credit(credit::CreditCommands),

    /// Audit log
    #[command(subcommand)]
    Audit(audit::AuditCommands),
}

/// Split `key=value`
pub fn parse_meta(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_help() {
        let result = Cli::try_parse_from(["bp", "--help"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_parse_award() {
        let cli = Cli::try_parse_from([
            "bp", "award", "--player", "P", "--amount", "120", "--source", "dice", "--meta",
            "table=4",
        ])
        .unwrap();
        match cli.command {
            Commands::Award { player, amount, source, meta } => {
                assert_eq!(player, "P");
                assert_eq!(amount, 120);
                assert_eq!(source, "dice");
                assert_eq!(meta, vec!["table=4".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verbose_forces_debug() {
        let cli = Cli::try_parse_from(["bp", "-v", "balance", "--player", "P"]).unwrap();
        assert_eq!(cli.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_parse_meta() {
        assert_eq!(
            parse_meta("table = 4"),
            Some(("table".to_string(), "4".to_string()))
        );
        assert_eq!(parse_meta("novalue"), None);
        assert_eq!(parse_meta("=x"), None);
    }
}
