//! Blacklist store
//!
//! Disqualified token addresses and developer identities. Membership only
//! grows: nothing in this module removes an entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::filter::types::{Gate, TokenCandidate};

/// What a blacklist entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistKind {
    Token,
    Developer,
}

impl BlacklistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlacklistKind::Token => "token",
            BlacklistKind::Developer => "developer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "token" => Some(BlacklistKind::Token),
            "developer" => Some(BlacklistKind::Developer),
            _ => None,
        }
    }
}

impl fmt::Display for BlacklistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token address or developer identity marked disqualified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub kind: BlacklistKind,
    pub value: String,
    /// Gate that caused the entry
    pub gate: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory blacklist owned by the cycle state
#[derive(Debug, Default)]
pub struct Blacklist {
    tokens: HashSet<String>,
    developers: HashSet<String>,
    include_unknown_developer: bool,
}

impl Blacklist {
    pub fn new(include_unknown_developer: bool) -> Self {
        Self {
            include_unknown_developer,
            ..Default::default()
        }
    }

    /// Seed from previously persisted entries
    pub fn load(&mut self, entries: impl IntoIterator<Item = BlacklistEntry>) {
        for entry in entries {
            match entry.kind {
                BlacklistKind::Token => self.tokens.insert(entry.value),
                BlacklistKind::Developer => self.developers.insert(entry.value),
            };
        }
    }

    pub fn contains_token(&self, address: &str) -> bool {
        self.tokens.contains(address)
    }

    pub fn contains_developer(&self, developer: &str) -> bool {
        self.developers.contains(developer)
    }

    /// Blacklist a candidate's address and developer identity.
    ///
    /// Returns only the entries that were not already present.
    pub fn blacklist(&mut self, candidate: &TokenCandidate, gate: Gate, reason: &str) -> Vec<BlacklistEntry> {
        let now = Utc::now();
        let mut added = Vec::new();

        if self.tokens.insert(candidate.address.clone()) {
            added.push(BlacklistEntry {
                kind: BlacklistKind::Token,
                value: candidate.address.clone(),
                gate: gate.to_string(),
                reason: reason.to_string(),
                created_at: now,
            });
        }

        let skip_developer = candidate.has_unknown_developer() && !self.include_unknown_developer;
        if !skip_developer && self.developers.insert(candidate.developer.clone()) {
            added.push(BlacklistEntry {
                kind: BlacklistKind::Developer,
                value: candidate.developer.clone(),
                gate: gate.to_string(),
                reason: reason.to_string(),
                created_at: now,
            });
        }

        added
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn developer_count(&self) -> usize {
        self.developers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::UNKNOWN_DEVELOPER;

    fn candidate(address: &str, developer: &str) -> TokenCandidate {
        TokenCandidate {
            address: address.into(),
            name: "Test".into(),
            symbol: "TST".into(),
            developer: developer.into(),
            price_usd: 1.0,
            market_cap_usd: 500_000.0,
            liquidity_usd: 50_000.0,
            volume_24h_usd: 200_000.0,
            price_change_24h_pct: 2.0,
        }
    }

    #[test]
    fn test_blacklist_adds_token_and_developer() {
        let mut blacklist = Blacklist::new(false);
        let added = blacklist.blacklist(&candidate("Mint1", "Dev1"), Gate::Reputation, "risky");

        assert_eq!(added.len(), 2);
        assert!(blacklist.contains_token("Mint1"));
        assert!(blacklist.contains_developer("Dev1"));
    }

    #[test]
    fn test_blacklist_is_idempotent() {
        let mut blacklist = Blacklist::new(false);
        let c = candidate("Mint1", "Dev1");
        blacklist.blacklist(&c, Gate::Reputation, "risky");
        let again = blacklist.blacklist(&c, Gate::FakeVolumeOracle, "again");
        assert!(again.is_empty());
        assert_eq!(blacklist.token_count(), 1);
        assert_eq!(blacklist.developer_count(), 1);
    }

    #[test]
    fn test_unknown_developer_skipped_by_default() {
        let mut blacklist = Blacklist::new(false);
        let added = blacklist.blacklist(&candidate("Mint1", UNKNOWN_DEVELOPER), Gate::Reputation, "risky");
        assert_eq!(added.len(), 1);
        assert!(!blacklist.contains_developer(UNKNOWN_DEVELOPER));

        let mut strict = Blacklist::new(true);
        strict.blacklist(&candidate("Mint1", UNKNOWN_DEVELOPER), Gate::Reputation, "risky");
        assert!(strict.contains_developer(UNKNOWN_DEVELOPER));
    }

    #[test]
    fn test_load_entries() {
        let mut blacklist = Blacklist::new(false);
        blacklist.load(vec![
            BlacklistEntry {
                kind: BlacklistKind::Token,
                value: "Mint9".into(),
                gate: "reputation".into(),
                reason: "risky".into(),
                created_at: Utc::now(),
            },
            BlacklistEntry {
                kind: BlacklistKind::Developer,
                value: "Dev9".into(),
                gate: "reputation".into(),
                reason: "risky".into(),
                created_at: Utc::now(),
            },
        ]);
        assert!(blacklist.contains_token("Mint9"));
        assert!(blacklist.contains_developer("Dev9"));
        assert!(!blacklist.contains_token("Dev9"));
    }
}
