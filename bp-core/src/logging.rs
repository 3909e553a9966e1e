//! Logging Conventions
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Audit sink failures, storage failures inside a stage |
//! | WARN  | Lock timeouts, fuzzy player matches, aborted commits |
//! | INFO  | Awards, commits, reverts, credit movements |
//! | DEBUG | Stage-by-stage pipeline flow |
//!
//! Log with structured fields (`player_id`, `event_id`, `batch_id`, `stage`):
//!
//! ```ignore
//! info!(player_id = %player, delta, "Award applied");
//! ```

use serde::{Deserialize, Serialize};

/// Target for audit sink failures. Kept separate so operators can route it.
pub const AUDIT_DIAGNOSTICS_TARGET: &str = "bp::audit_diagnostics";

/// Log level enumeration matching tracing levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Default filter directive for the bp crates at this level
    pub fn filter_directive(&self) -> String {
        let level = self.as_str();
        format!(
            "bp_cli={level},bp_engine={level},bp_store={level},{}=error",
            AUDIT_DIAGNOSTICS_TARGET
        )
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_filter_directive_keeps_diagnostics() {
        let d = LogLevel::Debug.filter_directive();
        assert!(d.contains("bp_engine=debug"));
        assert!(d.contains("bp::audit_diagnostics=error"));
    }
}
