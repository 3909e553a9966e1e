//! Identity Resolution
//!
//! Maps free-form player input to a canonical player id.

use bp_core::types::PlayerId;
use std::collections::BTreeSet;
use tracing::warn;

/// How a player was matched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchMethod {
    Exact,
    /// Weaker: input was a fragment of exactly one known id
    Substring,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub player_id: PlayerId,
    pub method: MatchMethod,
}

impl Resolution {
    pub fn is_fuzzy(&self) -> bool {
        self.method == MatchMethod::Substring
    }
}

/// External identity resolver
pub trait IdentityResolver: Send + Sync {
    /// `None` when the input names no player
    fn resolve(&self, input: &str) -> Option<Resolution>;
}

/// Resolver over a fixed roster of canonical ids.
///
/// Exact match is trimmed. A byte-for-byte hit wins; otherwise a
/// case-insensitive hit must be unique. The substring fallback only answers
/// when the fragment identifies a single player.
#[derive(Clone, Debug, Default)]
pub struct RosterResolver {
    roster: BTreeSet<String>,
}

impl RosterResolver {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roster = ids
            .into_iter()
            .map(Into::into)
            .map(|id: String| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        Self { roster }
    }

    /// Parse a roster: one id per line, `#` comments and blank lines skipped
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        )
    }

    pub fn add(&mut self, id: impl Into<String>) {
        let id = id.into().trim().to_string();
        if !id.is_empty() {
            self.roster.insert(id);
        }
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }
}

impl IdentityResolver for RosterResolver {
    fn resolve(&self, input: &str) -> Option<Resolution> {
        let needle = input.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let trimmed = input.trim();
        if let Some(id) = self.roster.get(trimmed) {
            return Some(Resolution {
                player_id: PlayerId::new(id.clone()),
                method: MatchMethod::Exact,
            });
        }

        let mut exact = self.roster.iter().filter(|id| id.to_lowercase() == needle);
        if let Some(id) = exact.next() {
            if exact.next().is_some() {
                warn!(input = %input, "Player ids differ only by case, refusing match");
                return None;
            }
            return Some(Resolution {
                player_id: PlayerId::new(id.clone()),
                method: MatchMethod::Exact,
            });
        }

        let mut candidates = self
            .roster
            .iter()
            .filter(|id| id.to_lowercase().contains(&needle));
        let first = candidates.next()?;
        if candidates.next().is_some() {
            warn!(input = %input, "Ambiguous player fragment, refusing substring match");
            return None;
        }

        warn!(input = %input, player_id = %first, "Player resolved by substring match");
        Some(Resolution {
            player_id: PlayerId::new(first.clone()),
            method: MatchMethod::Substring,
        })
    }
}
