//! Ticker universe — an opaque membership set of eligible symbols.
//!
//! Eligibility filtering (ETFs, warrants, preferred shares, SPACs, bonds
//! excluded) happens upstream; the pipeline only asks `contains`. The TOML
//! loader accepts a file of sector-organized ticker lists and flattens it.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Normalized (trimmed, uppercased) membership set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Universe {
    symbols: BTreeSet<String>,
}

/// On-disk shape: `[sectors]` table mapping sector name to ticker list.
#[derive(Debug, Deserialize)]
struct UniverseFile {
    sectors: BTreeMap<String, Vec<String>>,
}

impl Universe {
    /// Build from any symbol iterator; empties are dropped, the rest are
    /// trimmed and uppercased.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = symbols
            .into_iter()
            .filter_map(|s| normalize(s.as_ref()))
            .collect();
        Self { symbols }
    }

    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read universe file: {e}"))?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let file: UniverseFile =
            toml::from_str(content).map_err(|e| format!("parse universe TOML: {e}"))?;
        Ok(Self::from_symbols(file.sectors.into_values().flatten()))
    }

    /// Membership test; the query is normalized the same way as members.
    pub fn contains(&self, ticker: &str) -> bool {
        match normalize(ticker) {
            Some(t) => self.symbols.contains(&t),
            None => false,
        }
    }

    /// Add a symbol (used to make requested base tickers eligible).
    pub fn insert(&mut self, ticker: &str) {
        if let Some(t) = normalize(ticker) {
            self.symbols.insert(t);
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

fn normalize(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_ascii_uppercase())
    }
}
