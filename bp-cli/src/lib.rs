//! Bonus Points CLI
//!
//! Operator tool over a local sled-backed ledger.
//!
//! # Usage
//!
//! ```text
//! bp [OPTIONS] <COMMAND>
//!
//! Commands:
//!   award     Award points to a player
//!   resync    Re-run aggregate and governor for a player
//!   balance   Show balances, prestige and store credit
//!   redeem    Record a redemption against a player
//!   event     Preview/commit protocol and spent pool
//!   credit    Store credit ledger
//!   audit     Audit log
//!
//! Options:
//!   -d, --data-dir <DIR>    Ledger data directory [env: BP_DATA_DIR]
//!   -r, --roster <FILE>     Player roster, one id per line [env: BP_ROSTER]
//!   -o, --operator <NAME>   Operator recorded on audit entries [env: BP_OPERATOR]
//!   -f, --format <FORMAT>   Output format (json, table) [default: table]
//!   -v, --verbose           Debug logging
//! ```
//!
//! # Examples
//!
//! ```text
//! bp award --player P --amount 120 --source dice
//! bp event preview --event E --allocation plan.json --seed 7
//! bp event commit --event E --hash <hex> --lines lines.json
//! bp event revert --batch B0001712345678-...
//! ```

pub mod commands;
pub mod error;
pub mod handler;
pub mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use error::{CliError, CliResult};

/// CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
